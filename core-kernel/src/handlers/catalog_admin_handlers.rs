use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use shared::*;
use uuid::Uuid;

use crate::handlers::submission_handlers::store_error_to_status;
use crate::KernelState;

pub async fn list_tasks(State(state): State<KernelState>) -> Result<Json<Vec<Task>>, StatusCode> {
    let tasks = state.kernel.db().list_tasks().await.map_err(store_error_to_status)?;
    Ok(Json(tasks))
}

pub async fn get_problem(
    State(state): State<KernelState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Problem>, StatusCode> {
    let problem = state
        .kernel
        .db()
        .full_problem_by_task_id(task_id)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(problem))
}

pub async fn create_task(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<Task>, StatusCode> {
    require_admin(&user)?;
    let task = state
        .kernel
        .db()
        .create_task(payload)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(task))
}

pub async fn create_task_template(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CreateTaskTemplateRequest>,
) -> Result<Json<TaskTemplate>, StatusCode> {
    require_admin(&user)?;
    let template = state
        .kernel
        .db()
        .create_task_template(task_id, payload)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(template))
}

pub async fn create_test_case(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CreateTestCaseRequest>,
) -> Result<Json<TestCase>, StatusCode> {
    require_admin(&user)?;
    let test_case = state
        .kernel
        .db()
        .create_test_case(task_id, payload)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(test_case))
}

pub async fn delete_task(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    require_admin(&user)?;
    state
        .kernel
        .db()
        .delete_task(task_id)
        .await
        .map_err(store_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

fn require_admin(user: &AuthUser) -> Result<(), StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(())
}
