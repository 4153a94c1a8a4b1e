//! Activity API endpoints

use autoportal_database::queries::activity;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{error, instrument};

use super::{ApiError, PaginationMeta, PaginationParams};
use crate::state::AppState;

/// Create activity router
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_activity))
}

/// List recent activity entries
#[instrument(skip(state))]
async fn list_activity(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let per_page = pagination.per_page.clamp(10, 100);
    let offset = (pagination.page.max(1) - 1) * per_page;

    let entries = activity::list_activities(&state.pool, per_page as i64, offset as i64)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list activity");
            ApiError::internal_error(format!("Failed to list activity: {}", e))
        })?;

    let total = entries.len();
    let pagination = PaginationMeta::new(pagination.page, per_page, total);

    Ok(Json(json!({
        "activities": entries,
        "pagination": pagination
    })))
}
