//! Audit log reader endpoints
//!
//! Operator-facing view over the durable launch audit log: list with
//! level filter and limit, and clear.

use autoportal_core::LogLevel;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};

use super::ApiError;
use crate::state::AppState;

/// Create logs router
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_logs).delete(clear_logs))
}

#[derive(Debug, Deserialize)]
struct LogFilters {
    #[serde(default)]
    level: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    200
}

/// List audit entries, newest first
#[instrument(skip(state))]
async fn list_logs(
    State(state): State<AppState>,
    Query(filters): Query<LogFilters>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let level = match filters.level.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            LogLevel::from_str(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown log level '{}'", raw)))?,
        ),
    };

    let entries = state
        .audit
        .list(level, filters.limit.clamp(1, 1000))
        .map_err(|e| {
            error!(error = %e, "Failed to read audit log");
            ApiError::internal_error(format!("Failed to read audit log: {}", e))
        })?;

    Ok(Json(json!({ "entries": entries })))
}

/// Clear the audit log
#[instrument(skip(state))]
async fn clear_logs(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    state.audit.clear().map_err(|e| {
        error!(error = %e, "Failed to clear audit log");
        ApiError::internal_error(format!("Failed to clear audit log: {}", e))
    })?;

    info!("Audit log cleared");
    Ok(Json(json!({ "message": "Audit log cleared" })))
}
