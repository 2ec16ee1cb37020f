pub mod config;
pub mod dispatcher;
pub mod judge_client;
pub mod queue;
pub mod store;
pub mod worker;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use judge_client::{CreateSubmissionRequest, Judge, JudgeClient, JudgeError, JudgeSubmissionInfo};
pub use queue::{QueueFullError, SubmissionQueue};
pub use store::EvaluationStore;
pub use worker::{DispatchedJob, WorkerPool};
