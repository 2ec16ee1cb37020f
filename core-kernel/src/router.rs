use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{auth::require_auth, handlers::*, KernelState};

pub fn build_router(state: KernelState) -> Router<KernelState> {
    let authenticated = Router::new()
        .route("/api/solutions", post(submission_handlers::create_solution))
        .route("/api/solutions/:id", get(submission_handlers::get_solution))
        .route(
            "/api/solutions/:id/results",
            get(submission_handlers::get_results_by_solution),
        )
        .route(
            "/api/tasks/:task_id/solutions",
            get(submission_handlers::list_solutions_by_user_and_task),
        )
        .route("/api/users/:id/progress", get(progress_handlers::progress))
        .route("/api/users/:id/statistics", get(progress_handlers::statistics))
        .route(
            "/api/tasks",
            post(catalog_admin_handlers::create_task),
        )
        .route(
            "/api/tasks/:task_id/templates",
            post(catalog_admin_handlers::create_task_template),
        )
        .route(
            "/api/tasks/:task_id/test-cases",
            post(catalog_admin_handlers::create_test_case),
        )
        .route("/api/tasks/:task_id", delete(catalog_admin_handlers::delete_task))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", get(catalog_admin_handlers::list_tasks))
        .route("/api/tasks/:task_id", get(catalog_admin_handlers::get_problem))
        .route(
            "/api/judge/statuses",
            get(submission_handlers::available_statuses),
        )
        .route(
            "/api/judge/languages",
            get(submission_handlers::available_languages),
        )
        .merge(authenticated)
}

async fn health() -> &'static str {
    "ok"
}
