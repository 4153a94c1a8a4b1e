//! REST API endpoints
//!
//! ```text
//! /api/
//! ├── health                       GET     Health check
//! ├── status                       GET     Server status
//! │
//! ├── catalog/                     CRUD + run + schedules
//! ├── runs/                        List + get + cancel + reserve-id
//! ├── settings/                    List + get + update
//! ├── awx/                         Designer passthrough (templates, inventories, jobs)
//! ├── logs/                        Audit log reader
//! └── activity/                    Recent activity entries
//! ```

pub mod activity;
pub mod awx;
pub mod catalog;
pub mod logs;
pub mod runs;
pub mod settings;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::state::AppState;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: ApiErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetails {
                code: code.to_string(),
                message: message.into(),
                error_type: None,
                hint: None,
            },
        }
    }

    pub fn not_found(resource: &str) -> (StatusCode, Json<Self>) {
        (
            StatusCode::NOT_FOUND,
            Json(Self::new("NOT_FOUND", format!("{} not found", resource))),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self::new("BAD_REQUEST", message)),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new("INTERNAL_ERROR", message)),
        )
    }

    pub fn conflict(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::CONFLICT, Json(Self::new("CONFLICT", message)))
    }

    /// A classified remote failure: the kind and its remediation hint
    /// travel with the verbatim message so the UI can show both.
    pub fn upstream(classified: &autoportal_core::ClassifiedError) -> (StatusCode, Json<Self>) {
        let mut error = Self::new("UPSTREAM_ERROR", classified.message.clone());
        error.error.error_type = Some(classified.kind.as_str().to_string());
        error.error.hint = classified.kind.remediation().map(str::to_string);
        (StatusCode::BAD_GATEWAY, Json(error))
    }
}

/// Pagination parameters for list endpoints
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    50
}

/// Pagination metadata for list responses
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl PaginationMeta {
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// Create the complete API router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(server_status))
        .nest("/catalog", catalog::routes())
        .nest("/runs", runs::routes())
        .nest("/settings", settings::routes())
        .nest("/awx", awx::routes())
        .nest("/logs", logs::routes())
        .nest("/activity", activity::routes())
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "autoportal",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Server status endpoint
async fn server_status(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    let demo = match state.config_provider.get_config().await {
        Ok(config) => autoportal_core::config::is_placeholder(&config.base_url),
        Err(_) => true,
    };

    Json(json!({
        "status": "running",
        "demo_mode": demo,
        "audit_log": state.audit.path().display().to_string(),
    }))
}
