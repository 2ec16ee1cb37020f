//! Bounded in-memory FIFO submission queue (C6).
//!
//! Grounded in the Go `solutionQueue` (`container/list` + `sync.Mutex`): a
//! plain mutex-guarded deque, not a channel, because the dispatcher needs to
//! peek/drain in batches rather than await one item at a time.

use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("submission queue is full")]
pub struct QueueFullError;

/// Holds solution IDs awaiting dispatch. Not durable: a process restart
/// drops anything still queued (documented Non-goal).
pub struct SubmissionQueue {
    capacity: usize,
    items: Mutex<VecDeque<Uuid>>,
}

impl SubmissionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push_back(&self, solution_id: Uuid) -> Result<(), QueueFullError> {
        let mut items = self.items.lock().expect("submission queue mutex poisoned");
        if items.len() >= self.capacity {
            return Err(QueueFullError);
        }
        items.push_back(solution_id);
        Ok(())
    }

    pub fn pop_front(&self) -> Option<Uuid> {
        self.items
            .lock()
            .expect("submission queue mutex poisoned")
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("submission queue mutex poisoned").len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let q = SubmissionQueue::new(4);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        q.push_back(a).unwrap();
        q.push_back(b).unwrap();
        assert_eq!(q.pop_front(), Some(a));
        assert_eq!(q.pop_front(), Some(b));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn rejects_past_capacity() {
        let q = SubmissionQueue::new(1);
        q.push_back(Uuid::new_v4()).unwrap();
        assert!(q.push_back(Uuid::new_v4()).is_err());
    }
}
