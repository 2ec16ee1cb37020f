use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use shared::*;
use uuid::Uuid;

use crate::handlers::submission_handlers::{authorize_owner_or_admin, store_error_to_status};
use crate::KernelState;

pub async fn progress(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProgressSummary>, StatusCode> {
    authorize_owner_or_admin(&user, user_id)?;

    let summary = state
        .kernel
        .db()
        .progress_by_user(user_id)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct StatisticsQuery {
    dimension: StatDimension,
}

pub async fn statistics(
    State(state): State<KernelState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    axum::extract::Query(query): axum::extract::Query<StatisticsQuery>,
) -> Result<Json<UserStatistics>, StatusCode> {
    authorize_owner_or_admin(&user, user_id)?;

    let stats = state
        .kernel
        .db()
        .statistics_by_user(user_id, query.dimension)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(stats))
}
