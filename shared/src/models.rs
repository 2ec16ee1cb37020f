use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{JudgeVerdict, SolutionStatus};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub number: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub runtime_limit: f64,
    pub memory_limit: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskTemplate {
    pub id: Uuid,
    pub task_id: Uuid,
    pub language_id: Uuid,
    pub template: String,
    pub wrapper: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TestCase {
    pub id: Uuid,
    pub task_id: Uuid,
    pub number: i32,
    pub input: String,
    pub output: String,
}

/// Read-only aggregate assembled by the problem reader (C3); never stored
/// as its own row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub task: Task,
    pub task_templates: Vec<TaskTemplate>,
    pub test_cases: Vec<TestCase>,
}

impl Problem {
    pub fn template_for_language(&self, language_id: Uuid) -> Option<&TaskTemplate> {
        self.task_templates
            .iter()
            .find(|t| t.language_id == language_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Solution {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub language_id: Uuid,
    pub code: String,
    pub status: SolutionStatus,
    pub runtime: f64,
    pub memory: i32,
    pub submitted_at: DateTime<Utc>,
}

/// `Solution` without `code`, for listing endpoints. The full body is only
/// ever returned from the single-solution read, and only to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub language_id: Uuid,
    pub status: SolutionStatus,
    pub runtime: f64,
    pub memory: i32,
    pub submitted_at: DateTime<Utc>,
}

impl From<Solution> for SolutionSummary {
    fn from(s: Solution) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            task_id: s.task_id,
            language_id: s.language_id,
            status: s.status,
            runtime: s.runtime,
            memory: s.memory,
            submitted_at: s.submitted_at,
        }
    }
}

pub struct CreateSolutionParams {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub language_id: Uuid,
    pub code: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Default)]
pub struct UpdateSolutionParams {
    pub id: Uuid,
    pub status: Option<SolutionStatus>,
    pub runtime: Option<f64>,
    pub memory: Option<i32>,
}

impl UpdateSolutionParams {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SolutionResult {
    pub solution_id: Uuid,
    pub test_case_id: Uuid,
    pub submission_token: String,
    pub status: JudgeVerdict,
    pub runtime: f64,
    pub memory: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

/// A result row not yet assigned a sequence number; produced by the worker
/// pool and appended in a single batch at the end of evaluation.
#[derive(Debug, Clone)]
pub struct NewSolutionResult {
    pub test_case_id: Uuid,
    pub submission_token: String,
    pub status: JudgeVerdict,
    pub runtime: f64,
    pub memory: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

// --- API request/response DTOs -------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    pub task_id: Uuid,
    pub language_id: Uuid,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub solution_id: Uuid,
}

/// The authenticated caller, as extracted by the (out-of-scope) upstream
/// auth collaborator and attached to the request as an axum `Extension`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub completed: Vec<Uuid>,
    pub in_progress: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatisticRow {
    pub param: String,
    pub count_done: i64,
    pub count_total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatistics {
    pub dimension: String,
    pub rows: Vec<StatisticRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeStatusInfo {
    pub id: i32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeLanguageInfo {
    pub id: Uuid,
    pub name: String,
}

// --- Catalog admin DTOs (thin CRUD surface, not part of the evaluated core) ---

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub number: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub runtime_limit: f64,
    pub memory_limit: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskTemplateRequest {
    pub language_id: Uuid,
    pub template: String,
    pub wrapper: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTestCaseRequest {
    pub number: i32,
    pub input: String,
    pub output: String,
}
