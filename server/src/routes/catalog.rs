//! Catalog API endpoints
//!
//! CRUD for catalog items plus the run-automation action and per-item
//! schedules. Create/update validation enforces the schema invariants
//! (unique field keys, parseable custom body) and the template-id lock.

use autoportal_core::{initial_value, CurrentUser, Error};
use autoportal_database::models::{CreateCatalogItem, CreateSchedule, UpdateCatalogItem};
use autoportal_database::queries::{catalog, schedules};
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

use super::ApiError;
use crate::executor::{self, RunRequest};
use crate::state::AppState;

/// Create catalog router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/{id}/run", post(run_item))
        .route("/{id}/form", post(render_form))
        .route("/{id}/schedules", get(list_schedules).post(create_schedule))
        .route("/{id}/schedules/{schedule_id}", axum::routing::delete(delete_schedule))
        .route("/{id}/schedules/{schedule_id}/toggle", post(toggle_schedule))
}

#[derive(Debug, Deserialize)]
struct ListFilters {
    #[serde(default)]
    namespace: Option<String>,
}

/// List catalog items
#[instrument(skip(state))]
async fn list_items(
    State(state): State<AppState>,
    Query(filters): Query<ListFilters>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let items = catalog::list_catalog_items(&state.pool, filters.namespace.as_deref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list catalog items");
            ApiError::internal_error(format!("Failed to list catalog items: {}", e))
        })?;

    Ok(Json(json!({ "catalog_items": items })))
}

/// Get catalog item by id, with the parsed schema and the template
/// variables the run form needs to collect
#[instrument(skip(state))]
async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let item = catalog::get_catalog_item(&state.pool, &id)
        .await
        .map_err(|_| ApiError::not_found("Catalog item"))?;

    let form_schema = item.get_form_schema();
    let template_variables = item.template_variables();

    Ok(Json(json!({
        "catalog_item": item,
        "form_schema": form_schema,
        "template_variables": template_variables,
    })))
}

/// Create a catalog item
#[instrument(skip(state, input))]
async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<CreateCatalogItem>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    input.validate().map_err(ApiError::bad_request)?;

    let item = catalog::create_catalog_item(&state.pool, &input)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create catalog item");
            ApiError::internal_error(format!("Failed to create catalog item: {}", e))
        })?;

    info!(id = %item.id, name = %item.name, "Catalog item created");
    Ok((StatusCode::CREATED, Json(json!({ "catalog_item": item }))))
}

/// Update input wrapper: carries an optional template id only to verify
/// it does not change (the field is locked after creation)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateItemInput {
    template_id: Option<String>,
    #[serde(flatten)]
    update: UpdateCatalogItem,
}

/// Update a catalog item
#[instrument(skip(state, input))]
async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateItemInput>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    input.update.validate().map_err(ApiError::bad_request)?;

    let existing = catalog::get_catalog_item(&state.pool, &id)
        .await
        .map_err(|_| ApiError::not_found("Catalog item"))?;

    if let Some(template_id) = &input.template_id {
        if template_id != &existing.template_id {
            return Err(ApiError::conflict(
                "Job template id is locked after creation and cannot be changed",
            ));
        }
    }

    let item = catalog::update_catalog_item(&state.pool, &id, &input.update)
        .await
        .map_err(|e| {
            error!(error = %e, id = %id, "Failed to update catalog item");
            ApiError::internal_error(format!("Failed to update catalog item: {}", e))
        })?;

    Ok(Json(json!({ "catalog_item": item })))
}

/// Delete a catalog item
#[instrument(skip(state))]
async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    catalog::get_catalog_item(&state.pool, &id)
        .await
        .map_err(|_| ApiError::not_found("Catalog item"))?;

    catalog::delete_catalog_item(&state.pool, &id)
        .await
        .map_err(|e| {
            error!(error = %e, id = %id, "Failed to delete catalog item");
            ApiError::internal_error(format!("Failed to delete catalog item: {}", e))
        })?;

    info!(id = %id, "Catalog item deleted");
    Ok(Json(json!({ "message": "Catalog item deleted" })))
}

/// Render the initial form values for the current user (predefined
/// values resolved, defaults applied)
#[instrument(skip(state, user))]
async fn render_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(user): Json<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let item = catalog::get_catalog_item(&state.pool, &id)
        .await
        .map_err(|_| ApiError::not_found("Catalog item"))?;

    let fields: Vec<_> = item
        .get_form_schema()
        .into_iter()
        .map(|field| {
            let value = initial_value(&field, &user);
            json!({ "field": field, "initial_value": value })
        })
        .collect();

    Ok(Json(json!({ "fields": fields })))
}

/// Execute a catalog item
///
/// The response distinguishes local validation failures (nothing was
/// sent) from classified remote failures, and carries the classified
/// message verbatim for the UI.
#[instrument(skip(state, request), fields(catalog_id = %id))]
async fn run_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RunRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let item = catalog::get_catalog_item(&state.pool, &id)
        .await
        .map_err(|_| ApiError::not_found("Catalog item"))?;

    // Polling stops when the server shuts down or this request is
    // dropped; either way the timer is released.
    let cancel = state.shutdown.child_token();

    match executor::run_catalog_item(&state, &item, &request, &cancel).await {
        Ok(outcome) => Ok(Json(serde_json::to_value(&outcome).unwrap_or_default())),
        Err(e) if e.is_local() => Err(ApiError::bad_request(format!(
            "Validation failed, nothing was sent: {}",
            e
        ))),
        Err(Error::Launch(classified)) => Err(ApiError::upstream(&classified)),
        Err(e) => {
            error!(error = %e, "Automation execution failed");
            Err(ApiError::internal_error(format!(
                "Failed to execute automation: {}",
                e
            )))
        }
    }
}

/// List schedules of a catalog item
#[instrument(skip(state))]
async fn list_schedules(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let items = schedules::list_schedules(&state.pool, &id).await.map_err(|e| {
        error!(error = %e, "Failed to list schedules");
        ApiError::internal_error(format!("Failed to list schedules: {}", e))
    })?;

    Ok(Json(json!({ "schedules": items })))
}

/// Create a schedule for a catalog item
#[instrument(skip(state, input))]
async fn create_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateSchedule>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    input.validate().map_err(ApiError::bad_request)?;

    catalog::get_catalog_item(&state.pool, &id)
        .await
        .map_err(|_| ApiError::not_found("Catalog item"))?;

    let schedule = schedules::create_schedule(&state.pool, &id, &input)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create schedule");
            ApiError::internal_error(format!("Failed to create schedule: {}", e))
        })?;

    info!(schedule_id = schedule.id, catalog_id = %id, "Schedule created; active after restart");
    Ok((StatusCode::CREATED, Json(json!({ "schedule": schedule }))))
}

/// Delete a schedule
#[instrument(skip(state))]
async fn delete_schedule(
    State(state): State<AppState>,
    Path((_id, schedule_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    schedules::delete_schedule(&state.pool, schedule_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to delete schedule");
            ApiError::internal_error(format!("Failed to delete schedule: {}", e))
        })?;

    Ok(Json(json!({ "message": "Schedule deleted" })))
}

/// Enable/disable a schedule
#[instrument(skip(state))]
async fn toggle_schedule(
    State(state): State<AppState>,
    Path((_id, schedule_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let schedule = schedules::get_schedule(&state.pool, schedule_id)
        .await
        .map_err(|_| ApiError::not_found("Schedule"))?;

    schedules::set_enabled(&state.pool, schedule_id, !schedule.enabled)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to toggle schedule");
            ApiError::internal_error(format!("Failed to toggle schedule: {}", e))
        })?;

    Ok(Json(json!({ "enabled": !schedule.enabled })))
}
