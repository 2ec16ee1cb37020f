//! Wires the evaluation core (C1, C6-C8) to the database and exposes the
//! resulting handle as shared `axum` state.

use std::sync::Arc;

use evaluation_engine::{Dispatcher, JudgeClient, SubmissionQueue, WorkerPool};
use tokio::sync::mpsc;

use crate::{config::Config, database::Database};

pub struct JudiciaKernel {
    config: Arc<Config>,
    db: Database,
    judge: Arc<JudgeClient>,
    queue: Arc<SubmissionQueue>,
}

impl JudiciaKernel {
    pub async fn new(config: Arc<Config>, db: Database) -> anyhow::Result<Self> {
        let judge = Arc::new(
            JudgeClient::bootstrap(&config.evaluation.judge_host, config.evaluation.judge_port)
                .await?,
        );
        let queue = Arc::new(SubmissionQueue::new(config.evaluation.queue_capacity));

        Ok(Self {
            config,
            db,
            judge,
            queue,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn judge(&self) -> &Arc<JudgeClient> {
        &self.judge
    }

    pub fn queue(&self) -> &Arc<SubmissionQueue> {
        &self.queue
    }

    /// Spawns the dispatcher loop (C7) and worker pool (C8) as tokio tasks
    /// within this process: the single-process layout of the original
    /// manager, not a separate service behind a message broker.
    pub fn spawn_evaluation_tasks(&self) {
        let store: Arc<dyn evaluation_engine::EvaluationStore> = Arc::new(self.db.clone());
        let (worker_tx, worker_rx) = mpsc::channel(self.config.evaluation.worker_count);

        let dispatcher = Dispatcher::new(
            self.queue.clone(),
            store.clone(),
            worker_tx,
            self.config.evaluation.dispatch_poll_interval(),
        );
        tokio::spawn(dispatcher.run());

        let judge: Arc<dyn evaluation_engine::Judge> = self.judge.clone();
        let pool = WorkerPool::new(
            worker_rx,
            judge,
            store,
            self.config.evaluation.worker_count,
            self.config.evaluation.judge_queue_backoff(),
        );
        pool.spawn();
    }
}
