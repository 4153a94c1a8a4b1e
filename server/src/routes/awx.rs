//! Automation server passthrough endpoints
//!
//! Listings and job views the catalog designer and the run page need.
//! All of them go through the shared client, so demo mode and error
//! classification behave exactly as they do for launches.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, instrument};

use super::ApiError;
use crate::state::AppState;

/// Create awx passthrough router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/job-templates", get(list_job_templates))
        .route("/inventories", get(list_inventories))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/output", get(get_job_output))
        .route("/jobs/{id}/cancel", post(cancel_job))
}

fn map_remote_error(e: autoportal_core::Error) -> (StatusCode, Json<ApiError>) {
    match e.classified() {
        Some(classified) => ApiError::upstream(classified),
        None => ApiError::internal_error(e.to_string()),
    }
}

/// List job templates on the automation server
#[instrument(skip(state))]
async fn list_job_templates(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let templates = state.awx.list_job_templates(None).await.map_err(|e| {
        error!(error = %e, "Failed to list job templates");
        map_remote_error(e)
    })?;

    Ok(Json(json!({ "job_templates": templates })))
}

/// List inventories on the automation server
#[instrument(skip(state))]
async fn list_inventories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let inventories = state.awx.list_inventories(None).await.map_err(|e| {
        error!(error = %e, "Failed to list inventories");
        map_remote_error(e)
    })?;

    Ok(Json(json!({ "inventories": inventories })))
}

/// Current status of a remote job
#[instrument(skip(state))]
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let job = state.awx.get_job_status(id, None).await.map_err(|e| {
        error!(error = %e, job_id = id, "Failed to fetch job status");
        map_remote_error(e)
    })?;

    Ok(Json(json!({ "job": job })))
}

/// Output of a remote job
#[instrument(skip(state))]
async fn get_job_output(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let output = state.awx.get_job_output(id, None).await.map_err(|e| {
        error!(error = %e, job_id = id, "Failed to fetch job output");
        map_remote_error(e)
    })?;

    Ok(Json(json!({ "output": output })))
}

/// Cancel a remote job directly
#[instrument(skip(state))]
async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let response = state.awx.cancel_job(id, None).await.map_err(|e| {
        error!(error = %e, job_id = id, "Failed to cancel job");
        map_remote_error(e)
    })?;

    Ok(Json(json!({ "result": response })))
}
