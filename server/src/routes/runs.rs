//! Execution history API endpoints
//!
//! Read access to execution records, remote cancellation, and run-id
//! reservation for the run form.

use autoportal_core::CurrentUser;
use autoportal_database::models::ExecutionStatus;
use autoportal_database::queries::{executions, run_counters};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};

use super::{ApiError, PaginationMeta, PaginationParams};
use crate::state::AppState;

/// Create runs router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_runs))
        .route("/reserve-id", post(reserve_run_id))
        .route("/{id}", get(get_run))
        .route("/{id}/cancel", post(cancel_run))
}

#[derive(Debug, Deserialize)]
struct RunFilters {
    #[serde(default)]
    catalog_id: Option<String>,
    #[serde(flatten)]
    pagination: PaginationParams,
}

/// List executions with pagination
#[instrument(skip(state))]
async fn list_runs(
    State(state): State<AppState>,
    Query(filters): Query<RunFilters>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let per_page = filters.pagination.per_page.clamp(10, 100);
    let offset = (filters.pagination.page.max(1) - 1) * per_page;

    let total = executions::count_executions(&state.pool, filters.catalog_id.as_deref())
        .await
        .unwrap_or(0) as usize;

    let runs = executions::list_executions(
        &state.pool,
        filters.catalog_id.as_deref(),
        per_page as i64,
        offset as i64,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list executions");
        ApiError::internal_error(format!("Failed to list executions: {}", e))
    })?;

    let pagination = PaginationMeta::new(filters.pagination.page, per_page, total);

    Ok(Json(json!({
        "executions": runs,
        "pagination": pagination
    })))
}

/// Get execution by id
#[instrument(skip(state))]
async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let run = executions::get_execution(&state.pool, id)
        .await
        .map_err(|_| ApiError::not_found("Execution"))?;

    Ok(Json(json!({ "execution": run })))
}

/// Reserve a run id before the form is submitted, so the user sees the
/// id their execution will carry
#[instrument(skip(state, user))]
async fn reserve_run_id(
    State(state): State<AppState>,
    Json(user): Json<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let unique_id = run_counters::reserve_run_id(&state.pool, Some(&user))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reserve run id");
            ApiError::internal_error(format!("Failed to reserve run id: {}", e))
        })?;

    Ok(Json(json!({ "unique_id": unique_id })))
}

/// Cancel a running execution's remote job
#[instrument(skip(state))]
async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let run = executions::get_execution(&state.pool, id)
        .await
        .map_err(|_| ApiError::not_found("Execution"))?;

    let Some(job_id) = run.awx_job_id.as_deref().and_then(|j| j.parse::<i64>().ok()) else {
        return Err(ApiError::bad_request(
            "Execution has no remote job to cancel",
        ));
    };

    if !run.is_running() {
        return Err(ApiError::conflict("Execution is already complete"));
    }

    let response = state.awx.cancel_job(job_id, None).await.map_err(|e| {
        error!(error = %e, id = id, "Failed to cancel remote job");
        match e.classified() {
            Some(classified) => ApiError::upstream(classified),
            None => ApiError::internal_error(format!("Failed to cancel job: {}", e)),
        }
    })?;

    executions::complete(
        &state.pool,
        id,
        ExecutionStatus::Cancelled,
        None,
        None,
        Some("Cancelled by operator"),
    )
    .await
    .map_err(|e| {
        error!(error = %e, id = id, "Failed to record cancellation");
        ApiError::internal_error(format!("Failed to record cancellation: {}", e))
    })?;

    info!(id = id, job_id = job_id, "Execution cancelled");
    Ok(Json(json!({ "message": "Execution cancelled", "remote": response })))
}
