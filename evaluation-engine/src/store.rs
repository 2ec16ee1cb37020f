//! Persistence seam between the evaluation core and `core-kernel`'s database.
//!
//! The dispatcher and worker pool need to read problems and write solution
//! state, but `core-kernel` owns the `sqlx::Postgres` pool and the
//! transaction coordinator (C2). Mirroring the way the original manager layer
//! is handed already-constructed service/transaction collaborators at
//! startup, `core-kernel` implements this trait over its `Database` and
//! injects it here as `Arc<dyn EvaluationStore>`, keeping this crate free of
//! any direct `sqlx` dependency.

use async_trait::async_trait;
use shared::{NewSolutionResult, Problem, Solution, StoreError, UpdateSolutionParams};
use uuid::Uuid;

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn problem_by_task_id(&self, task_id: Uuid) -> Result<Problem, StoreError>;

    async fn solution_by_id(&self, id: Uuid) -> Result<Solution, StoreError>;

    async fn update_solution(&self, params: UpdateSolutionParams) -> Result<(), StoreError>;

    /// Persists the full result set and the terminal status/runtime/memory
    /// in one transaction (§4.8: results and status never observed partially
    /// written).
    async fn finish_solution(
        &self,
        solution_id: Uuid,
        results: Vec<NewSolutionResult>,
        update: UpdateSolutionParams,
    ) -> Result<(), StoreError>;
}
