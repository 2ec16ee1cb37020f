//! Dispatch loop (C7): drains the submission queue and hands each solution to
//! the worker pool.
//!
//! Grounded in the wiring shape of the Go `Manager` (`workerCh` fed by a
//! single producer loop). The original left the loop body itself as a
//! `todo`, so the polling/backpressure/error-marking logic here is designed
//! fresh rather than ported.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, warn};
use uuid::Uuid;

use shared::UpdateSolutionParams;
use shared::SolutionStatus;

use crate::queue::SubmissionQueue;
use crate::store::EvaluationStore;
use crate::worker::DispatchedJob;

pub struct Dispatcher {
    queue: Arc<SubmissionQueue>,
    store: Arc<dyn EvaluationStore>,
    worker_tx: mpsc::Sender<DispatchedJob>,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<SubmissionQueue>,
        store: Arc<dyn EvaluationStore>,
        worker_tx: mpsc::Sender<DispatchedJob>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            store,
            worker_tx,
            poll_interval,
        }
    }

    /// Runs forever. Intended to be spawned as its own tokio task at startup.
    ///
    /// Polls on a fixed tick rather than waking on push (a `tokio::sync::Notify`
    /// signaled from `SubmissionQueue::push_back` would remove the latency floor
    /// and the idle wakeups); kept as a poll to match the original's lineage.
    pub async fn run(self) {
        let mut tick = tokio::time::interval(self.poll_interval);
        loop {
            tick.tick().await;
            while let Some(solution_id) = self.queue.pop_front() {
                self.dispatch_one(solution_id).await;
            }
        }
    }

    async fn dispatch_one(&self, solution_id: Uuid) {
        if let Err(e) = self.try_dispatch(solution_id).await {
            error!(%solution_id, error = %e, "dispatch failed, marking solution as Error");
            let mut update = UpdateSolutionParams::new(solution_id);
            update.status = Some(SolutionStatus::Error);
            if let Err(e) = self.store.update_solution(update).await {
                error!(%solution_id, error = %e, "failed to record dispatch failure");
            }
        }
    }

    async fn try_dispatch(&self, solution_id: Uuid) -> anyhow::Result<()> {
        let solution = self.store.solution_by_id(solution_id).await?;
        let problem = self.store.problem_by_task_id(solution.task_id).await?;

        let template = problem
            .template_for_language(solution.language_id)
            .ok_or_else(|| anyhow::anyhow!("no task template for language {}", solution.language_id))?
            .clone();

        let job = DispatchedJob {
            solution,
            problem,
            template,
        };

        // The worker channel is the backpressure point (C8): block here
        // rather than drop, since the solution is already off the bounded
        // submission queue and has nowhere else to live.
        if self.worker_tx.send(job).await.is_err() {
            warn!("worker pool channel closed, dropping dispatch");
            anyhow::bail!("worker pool is shut down");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Problem, Solution, Task};
    use std::sync::Mutex as StdMutex;

    struct FakeStore {
        problem: Problem,
        solution: Solution,
        updates: StdMutex<Vec<UpdateSolutionParams>>,
    }

    #[async_trait::async_trait]
    impl EvaluationStore for FakeStore {
        async fn problem_by_task_id(&self, _task_id: Uuid) -> Result<Problem, shared::StoreError> {
            Ok(self.problem.clone())
        }

        async fn solution_by_id(&self, _id: Uuid) -> Result<Solution, shared::StoreError> {
            Ok(self.solution.clone())
        }

        async fn update_solution(
            &self,
            params: UpdateSolutionParams,
        ) -> Result<(), shared::StoreError> {
            self.updates.lock().unwrap().push(params);
            Ok(())
        }

        async fn finish_solution(
            &self,
            _solution_id: Uuid,
            _results: Vec<shared::NewSolutionResult>,
            _update: UpdateSolutionParams,
        ) -> Result<(), shared::StoreError> {
            Ok(())
        }
    }

    fn sample_solution(language_id: Uuid) -> Solution {
        Solution {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            language_id,
            code: "x".into(),
            status: SolutionStatus::Testing,
            runtime: 0.0,
            memory: 0,
            submitted_at: chrono::Utc::now(),
        }
    }

    fn sample_problem() -> Problem {
        Problem {
            task: Task {
                id: Uuid::new_v4(),
                number: 1,
                name: "t".into(),
                description: "".into(),
                category: "".into(),
                difficulty: "easy".into(),
                runtime_limit: 1.0,
                memory_limit: 65536,
            },
            task_templates: Vec::new(),
            test_cases: Vec::new(),
        }
    }

    #[tokio::test]
    async fn missing_template_marks_solution_as_error() {
        let solution = sample_solution(Uuid::new_v4());
        let store = Arc::new(FakeStore {
            problem: sample_problem(),
            solution: solution.clone(),
            updates: StdMutex::new(Vec::new()),
        });
        let queue = Arc::new(SubmissionQueue::new(4));
        let (worker_tx, _worker_rx) = mpsc::channel(4);

        let dispatcher = Dispatcher::new(queue, store.clone(), worker_tx, Duration::from_millis(1));

        dispatcher.dispatch_one(solution.id).await;

        let updates = store.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, Some(SolutionStatus::Error));
    }
}
