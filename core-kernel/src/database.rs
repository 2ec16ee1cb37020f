//! Persistence layer: connection pool, the transaction coordinator (C2),
//! the problem reader (C3), the solution/result stores (C4/C5), and the
//! progress projector (C9).
//!
//! The transaction/after-commit design is a direct port of the Go
//! `TransactionProvider`/`Tx` pair (`pkg/postgres/postgres.go`): a bounded
//! channel drained by one background task invokes each transaction's
//! registered closures exactly once, in order, strictly after `COMMIT`
//! returns.

use async_trait::async_trait;
use shared::*;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use evaluation_engine::EvaluationStore;

type AfterCommitHook = Box<dyn FnOnce() + Send>;

/// One in-flight transaction plus the hooks queued to run after it commits.
pub struct Tx<'a> {
    inner: Transaction<'a, Postgres>,
    after_commit: Vec<AfterCommitHook>,
    sink: mpsc::Sender<Vec<AfterCommitHook>>,
}

impl<'a> Tx<'a> {
    /// Registers a closure to run once, after this transaction's `COMMIT`
    /// has returned successfully. Never runs if the transaction rolls back.
    pub fn after_commit(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.after_commit.push(Box::new(hook));
    }

    pub fn as_mut(&mut self) -> &mut Transaction<'a, Postgres> {
        &mut self.inner
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.inner.commit().await?;
        // Hooks run on a dedicated worker, never inline with the caller, so
        // a slow hook can't stall the request that committed it.
        let _ = self.sink.send(self.after_commit).await;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        self.inner.rollback().await?;
        Ok(())
    }
}

/// Owns the pool and the after-commit worker channel. Every store method on
/// [`Database`] opens its own transaction through here.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    after_commit_tx: mpsc::Sender<Vec<AfterCommitHook>>,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    /// Builds directly from an existing pool, bypassing connection setup.
    /// Used by `#[sqlx::test]`, which hands tests an already-migrated pool.
    pub fn from_pool(pool: PgPool) -> Self {
        let (after_commit_tx, mut after_commit_rx) = mpsc::channel::<Vec<AfterCommitHook>>(2000);
        tokio::spawn(async move {
            while let Some(hooks) = after_commit_rx.recv().await {
                for hook in hooks {
                    hook();
                }
            }
        });

        Database {
            pool,
            after_commit_tx,
        }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Tx<'_>, StoreError> {
        let inner = self.pool.begin().await?;
        Ok(Tx {
            inner,
            after_commit: Vec::new(),
            sink: self.after_commit_tx.clone(),
        })
    }

    // --- C3: problem reader --------------------------------------------------

    pub async fn full_problem_by_task_id(&self, task_id: Uuid) -> Result<Problem, StoreError> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM task WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        let task_templates =
            sqlx::query_as::<_, TaskTemplate>("SELECT * FROM task_template WHERE task_id = $1")
                .bind(task_id)
                .fetch_all(&self.pool)
                .await?;

        let test_cases =
            sqlx::query_as::<_, TestCase>("SELECT * FROM test_case WHERE task_id = $1 ORDER BY number")
                .bind(task_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Problem {
            task,
            task_templates,
            test_cases,
        })
    }

    // --- C4: solution store ---------------------------------------------------

    /// Creates the solution row and, after the transaction commits, enqueues
    /// it for dispatch, never before, so a rolled-back submission is never
    /// evaluated. The queue's capacity is checked before the row is even
    /// inserted: a doomed-to-fail push should never leave a stray solution
    /// committed with nowhere to go.
    pub async fn create_solution(
        &self,
        params: CreateSolutionParams,
        queue: Arc<evaluation_engine::SubmissionQueue>,
    ) -> Result<Solution, StoreError> {
        if queue.is_full() {
            return Err(StoreError::QueueFull);
        }

        let mut tx = self.begin().await?;

        let solution = sqlx::query_as::<_, Solution>(
            r#"
            INSERT INTO solution (id, user_id, task_id, language_id, code, status, runtime, memory, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, 0, 0, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.task_id)
        .bind(params.language_id)
        .bind(&params.code)
        .bind(SolutionStatus::Testing)
        .bind(chrono::Utc::now())
        .fetch_one(tx.as_mut())
        .await?;

        let solution_id = solution.id;
        tx.after_commit(move || {
            if let Err(e) = queue.push_back(solution_id) {
                tracing::error!(%solution_id, error = %e, "submission queue full, solution will not be evaluated");
            }
        });

        tx.commit().await?;
        Ok(solution)
    }

    pub async fn solution_by_id(&self, id: Uuid) -> Result<Solution, StoreError> {
        sqlx::query_as::<_, Solution>("SELECT * FROM solution WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    pub async fn solutions_by_user_and_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<Vec<Solution>, StoreError> {
        let rows = sqlx::query_as::<_, Solution>(
            "SELECT * FROM solution WHERE user_id = $1 AND task_id = $2 ORDER BY submitted_at DESC",
        )
        .bind(user_id)
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update_solution(&self, params: UpdateSolutionParams) -> Result<(), StoreError> {
        let current = self.solution_by_id(params.id).await?;

        if let Some(next) = params.status {
            if current.status.is_terminal() {
                return Err(StoreError::InvalidTransition {
                    from: current.status.to_string(),
                    to: next.to_string(),
                });
            }
        }

        sqlx::query(
            r#"
            UPDATE solution
            SET status = COALESCE($2, status),
                runtime = COALESCE($3, runtime),
                memory = COALESCE($4, memory)
            WHERE id = $1
            "#,
        )
        .bind(params.id)
        .bind(params.status)
        .bind(params.runtime)
        .bind(params.memory)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // --- C5: result store -------------------------------------------------------

    /// Persists the full result set and the terminal solution status in one
    /// transaction, so a crash mid-evaluation never leaves a solution
    /// `Testing` with some but not all results recorded.
    pub async fn finish_solution(
        &self,
        solution_id: Uuid,
        results: Vec<NewSolutionResult>,
        update: UpdateSolutionParams,
    ) -> Result<(), StoreError> {
        let current = self.solution_by_id(solution_id).await?;
        if current.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                from: current.status.to_string(),
                to: update.status.map(|s| s.to_string()).unwrap_or_default(),
            });
        }

        let mut tx = self.begin().await?;

        for result in &results {
            sqlx::query(
                r#"
                INSERT INTO solution_result
                    (solution_id, test_case_id, submission_token, status, runtime, memory, stdout, stderr)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(solution_id)
            .bind(result.test_case_id)
            .bind(&result.submission_token)
            .bind(result.status)
            .bind(result.runtime)
            .bind(result.memory)
            .bind(&result.stdout)
            .bind(&result.stderr)
            .execute(tx.as_mut())
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE solution
            SET status = COALESCE($2, status),
                runtime = COALESCE($3, runtime),
                memory = COALESCE($4, memory)
            WHERE id = $1
            "#,
        )
        .bind(solution_id)
        .bind(update.status)
        .bind(update.runtime)
        .bind(update.memory)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn results_by_solution_id(
        &self,
        solution_id: Uuid,
    ) -> Result<Vec<SolutionResult>, StoreError> {
        let rows = sqlx::query_as::<_, SolutionResult>(
            r#"
            SELECT solution_id, test_case_id, submission_token, status, runtime, memory, stdout, stderr
            FROM solution_result
            WHERE solution_id = $1
            ORDER BY seq
            "#,
        )
        .bind(solution_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // --- C9: progress projector --------------------------------------------------

    /// Grounded in the CTE shape from the original statistics query: a
    /// solution is `completed` if any of a user's solutions for that task
    /// reached `completed`, `in_progress` otherwise.
    pub async fn progress_by_user(&self, user_id: Uuid) -> Result<ProgressSummary, StoreError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            status: String,
            task_ids: Vec<Uuid>,
        }

        let rows = sqlx::query_as::<_, Row>(
            r#"
            WITH complete_s AS (
                SELECT DISTINCT task_id, user_id, status
                FROM solution
                WHERE status = 'completed'
            ),
            statuses AS (
                SELECT DISTINCT s.task_id, s.user_id,
                       COALESCE(complete_s.status, 'testing') AS status
                FROM solution s
                LEFT JOIN complete_s
                    ON s.user_id = complete_s.user_id AND s.task_id = complete_s.task_id
                WHERE s.user_id = $1
            )
            SELECT status, array_agg(task_id) AS task_ids
            FROM statuses
            GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut completed = Vec::new();
        let mut in_progress = Vec::new();
        for row in rows {
            match row.status.as_str() {
                "completed" => completed = row.task_ids,
                _ => in_progress = row.task_ids,
            }
        }

        Ok(ProgressSummary {
            completed,
            in_progress,
        })
    }

    pub async fn statistics_by_user(
        &self,
        user_id: Uuid,
        dimension: StatDimension,
    ) -> Result<UserStatistics, StoreError> {
        let column = dimension.column();
        let query = format!(
            r#"
            WITH complete_s AS (
                SELECT DISTINCT task_id, user_id, status
                FROM solution
                WHERE status = 'completed'
            ),
            statuses AS (
                SELECT DISTINCT s.task_id, s.user_id,
                       COALESCE(complete_s.status, 'testing') AS status
                FROM solution s
                LEFT JOIN complete_s
                    ON s.user_id = complete_s.user_id AND s.task_id = complete_s.task_id
                WHERE s.user_id = $1
            )
            SELECT t.{column} AS param, COUNT(s.task_id) AS count_done, COUNT(t.id) AS count_total
            FROM statuses s
            RIGHT JOIN task t ON t.id = s.task_id
            GROUP BY param
            "#
        );

        let rows = sqlx::query_as::<_, StatisticRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(UserStatistics {
            dimension: column.to_string(),
            rows,
        })
    }

    // --- catalog admin CRUD (thin, tx-per-operation per the problem manager pattern) ---

    pub async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query_as::<_, Task>("SELECT * FROM task ORDER BY number")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create_task(&self, req: CreateTaskRequest) -> Result<Task, StoreError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO task (id, number, name, description, category, difficulty, runtime_limit, memory_limit)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.number)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.category)
        .bind(&req.difficulty)
        .bind(req.runtime_limit)
        .bind(req.memory_limit)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    pub async fn create_task_template(
        &self,
        task_id: Uuid,
        req: CreateTaskTemplateRequest,
    ) -> Result<TaskTemplate, StoreError> {
        let template = sqlx::query_as::<_, TaskTemplate>(
            r#"
            INSERT INTO task_template (id, task_id, language_id, template, wrapper)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(req.language_id)
        .bind(&req.template)
        .bind(&req.wrapper)
        .fetch_one(&self.pool)
        .await?;
        Ok(template)
    }

    pub async fn create_test_case(
        &self,
        task_id: Uuid,
        req: CreateTestCaseRequest,
    ) -> Result<TestCase, StoreError> {
        let test_case = sqlx::query_as::<_, TestCase>(
            r#"
            INSERT INTO test_case (id, task_id, number, input, output)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(req.number)
        .bind(&req.input)
        .bind(&req.output)
        .fetch_one(&self.pool)
        .await?;
        Ok(test_case)
    }

    pub async fn delete_task(&self, task_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM task WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Bridges the dispatcher/worker pool (living in `evaluation-engine`, which
/// has no direct `sqlx` dependency) back to this pool.
#[async_trait]
impl EvaluationStore for Database {
    async fn problem_by_task_id(&self, task_id: Uuid) -> Result<Problem, StoreError> {
        self.full_problem_by_task_id(task_id).await
    }

    async fn solution_by_id(&self, id: Uuid) -> Result<Solution, StoreError> {
        Database::solution_by_id(self, id).await
    }

    async fn update_solution(&self, params: UpdateSolutionParams) -> Result<(), StoreError> {
        Database::update_solution(self, params).await
    }

    async fn finish_solution(
        &self,
        solution_id: Uuid,
        results: Vec<NewSolutionResult>,
        update: UpdateSolutionParams,
    ) -> Result<(), StoreError> {
        Database::finish_solution(self, solution_id, results, update).await
    }
}
