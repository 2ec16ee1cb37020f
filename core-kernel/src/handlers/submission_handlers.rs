use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use shared::*;
use uuid::Uuid;

use crate::KernelState;

pub async fn create_solution(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SubmissionRequest>,
) -> Result<Json<SubmissionResponse>, StatusCode> {
    // Ensures the task/template combination exists before a row is created
    // for it; mirrors the problem-manager's create-then-read-back shape.
    let problem = state
        .kernel
        .db()
        .full_problem_by_task_id(payload.task_id)
        .await
        .map_err(store_error_to_status)?;

    if problem.template_for_language(payload.language_id).is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let solution = state
        .kernel
        .db()
        .create_solution(
            CreateSolutionParams {
                user_id: user.id,
                task_id: payload.task_id,
                language_id: payload.language_id,
                code: payload.code,
            },
            state.kernel.queue().clone(),
        )
        .await
        .map_err(store_error_to_status)?;

    Ok(Json(SubmissionResponse {
        solution_id: solution.id,
    }))
}

pub async fn get_solution(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Solution>, StatusCode> {
    let solution = state
        .kernel
        .db()
        .solution_by_id(id)
        .await
        .map_err(store_error_to_status)?;

    authorize_owner_or_admin(&user, solution.user_id)?;

    Ok(Json(solution))
}

pub async fn list_solutions_by_user_and_task(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<SolutionSummary>>, StatusCode> {
    let solutions = state
        .kernel
        .db()
        .solutions_by_user_and_task(user.id, task_id)
        .await
        .map_err(store_error_to_status)?;

    Ok(Json(solutions.into_iter().map(SolutionSummary::from).collect()))
}

pub async fn get_results_by_solution(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SolutionResult>>, StatusCode> {
    let solution = state
        .kernel
        .db()
        .solution_by_id(id)
        .await
        .map_err(store_error_to_status)?;

    authorize_owner_or_admin(&user, solution.user_id)?;

    let results = state
        .kernel
        .db()
        .results_by_solution_id(id)
        .await
        .map_err(store_error_to_status)?;

    Ok(Json(results))
}

pub async fn available_statuses(
    State(state): State<KernelState>,
) -> Json<Vec<JudgeStatusInfo>> {
    Json(state.kernel.judge().statuses().to_vec())
}

pub async fn available_languages(
    State(state): State<KernelState>,
) -> Json<Vec<JudgeLanguageInfo>> {
    Json(state.kernel.judge().languages().to_vec())
}

/// Direct port of `access.go`'s ownership check: the caller must either own
/// the solution or carry the admin role.
pub(crate) fn authorize_owner_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), StatusCode> {
    if user.id != owner_id && !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(())
}

pub(crate) fn store_error_to_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
        StoreError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: Uuid, roles: Vec<&str>) -> AuthUser {
        AuthUser {
            id,
            roles: roles.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn owner_is_authorized() {
        let id = Uuid::new_v4();
        assert!(authorize_owner_or_admin(&user(id, vec![]), id).is_ok());
    }

    #[test]
    fn admin_can_access_others_solutions() {
        let admin = user(Uuid::new_v4(), vec!["admin"]);
        assert!(authorize_owner_or_admin(&admin, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn non_owner_non_admin_is_forbidden() {
        let caller = user(Uuid::new_v4(), vec![]);
        assert_eq!(
            authorize_owner_or_admin(&caller, Uuid::new_v4()),
            Err(StatusCode::FORBIDDEN)
        );
    }

    #[test]
    fn store_errors_map_to_expected_statuses() {
        assert_eq!(store_error_to_status(StoreError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            store_error_to_status(StoreError::InvalidTransition {
                from: "completed".into(),
                to: "testing".into(),
            }),
            StatusCode::CONFLICT
        );
    }
}
