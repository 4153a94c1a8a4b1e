//! Run-automation executor
//!
//! Ties the whole launch workflow together for one catalog item:
//! reserve a run id, persist the execution record, resolve the request
//! body, launch on the remote server, poll to completion, and decorate
//! the result with artifacts and output. Local resolution failures
//! never reach the network; remote failures arrive here already
//! classified and are persisted with full context.

use std::collections::HashMap;

use autoportal_core::{curl_command, template, CurrentUser, Error, Result};
use autoportal_database::models::{CreateActivity, CreateExecution, ExecutionStatus};
use autoportal_database::queries::{activity, catalog, executions, run_counters};
use autoportal_database::CatalogItem;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::state::AppState;

/// Attempts to create the execution record before giving up on
/// reserved-id collisions
const MAX_ID_ATTEMPTS: usize = 3;

/// Inputs of one run-automation invocation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunRequest {
    /// Submitted form values
    pub parameters: HashMap<String, Value>,
    /// JSON body edited by the user; bypasses template resolution
    pub custom_body_override: Option<String>,
    pub user: Option<CurrentUser>,
    /// Run id reserved by the form page before submitting
    pub reserved_task_id: Option<String>,
}

/// Result payload handed back to the UI layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub success: bool,
    pub message: String,
    pub data: RunData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
    pub unique_id: String,
    pub execution_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awx_job_id: Option<String>,
    pub status: String,
    pub request_body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_vars: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Value>,
    pub curl_command: String,
}

/// Execute a catalog item end to end.
///
/// The cancellation token bounds the polling phase; callers pass a
/// child of the server shutdown token so an aborted request or a
/// stopping server releases the poll timer.
pub async fn run_catalog_item(
    state: &AppState,
    item: &CatalogItem,
    request: &RunRequest,
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    let executed_by = request
        .user
        .as_ref()
        .map(CurrentUser::display_name)
        .unwrap_or_else(|| "system".to_string());

    let (execution, unique_id) = create_execution_record(state, item, request, &executed_by).await?;

    // Resolve the request body before anything touches the network;
    // failures here mean nothing was sent.
    let request_body = match resolve_body(item, request) {
        Ok(body) => body,
        Err(e) => {
            let message = e.to_string();
            executions::complete(
                &state.pool,
                execution.id,
                ExecutionStatus::Failed,
                None,
                None,
                Some(message.as_str()),
            )
            .await?;
            state.audit.error(
                "automation execution failed",
                json!({
                    "catalogId": item.id,
                    "uniqueId": unique_id,
                    "phase": "validation",
                    "error": message,
                }),
            );
            record_run_activity(state, item, &unique_id, &executed_by, "failed", &message).await;
            return Err(e);
        }
    };

    let config = state.config_provider.get_config().await.unwrap_or_default();
    let curl = curl_command(
        &config.base_url,
        &item.template_id,
        &request_body,
        &config.token,
    );

    state.audit.info(
        "automation execution started",
        json!({
            "catalogId": item.id,
            "catalogName": item.name,
            "uniqueId": unique_id,
            "templateId": item.template_id,
            "executedBy": executed_by,
            "parameters": request.parameters,
        }),
    );

    let descriptor = match state
        .awx
        .launch_job_template(&item.template_id, &request_body, None)
        .await
    {
        Ok(descriptor) => descriptor,
        Err(e) => {
            let message = e.to_string();
            executions::complete(
                &state.pool,
                execution.id,
                ExecutionStatus::Failed,
                None,
                None,
                Some(message.as_str()),
            )
            .await?;
            state.audit.error(
                "automation execution failed",
                json!({
                    "catalogId": item.id,
                    "uniqueId": unique_id,
                    "phase": "launch",
                    "errorType": e.classified().map(|c| c.kind.as_str()),
                    "error": message,
                }),
            );
            record_run_activity(state, item, &unique_id, &executed_by, "failed", &message).await;
            return Err(e);
        }
    };

    let awx_job_id = descriptor.id.to_string();
    let body_str = serde_json::to_string(&request_body)?;
    executions::set_launched(&state.pool, execution.id, &body_str, &awx_job_id).await?;
    info!(
        catalog_id = %item.id,
        unique_id = %unique_id,
        awx_job_id = %awx_job_id,
        "Automation launched"
    );

    let extra_vars = request_body.get("extra_vars").cloned();

    // Track the remote job to completion; a poll timeout is advisory,
    // not a failure - the job may still finish on the server.
    let (status_label, message, artifacts) = match state
        .awx
        .poll_job_until_complete(
            descriptor.id,
            autoportal_core::DEFAULT_MAX_WAIT,
            autoportal_core::DEFAULT_INTERVAL,
            None,
            cancel,
        )
        .await
    {
        Ok(final_descriptor) => {
            let artifacts = collect_artifacts(state, descriptor.id).await;
            let succeeded = final_descriptor.status.is_successful();
            let status = if succeeded {
                ExecutionStatus::Success
            } else {
                ExecutionStatus::Failed
            };
            let error_message = (!succeeded).then(|| {
                final_descriptor
                    .job_explanation
                    .clone()
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "Job failed".to_string())
            });

            let result_json = serde_json::to_string(&final_descriptor)?;
            let artifacts_json = serde_json::to_string(&artifacts)?;
            executions::complete(
                &state.pool,
                execution.id,
                status,
                Some(result_json.as_str()),
                Some(artifacts_json.as_str()),
                error_message.as_deref(),
            )
            .await?;

            state.audit.info(
                "automation execution completed",
                json!({
                    "catalogId": item.id,
                    "uniqueId": unique_id,
                    "awxJobId": awx_job_id,
                    "status": final_descriptor.status.as_str(),
                }),
            );

            let message = if succeeded {
                "Automation completed successfully".to_string()
            } else {
                "Automation failed".to_string()
            };
            (status.as_str().to_string(), message, Some(artifacts))
        }
        Err(e) => {
            warn!(
                unique_id = %unique_id,
                awx_job_id = %awx_job_id,
                error = %e,
                "Polling did not reach a terminal state"
            );
            let advisory = format!(
                "Job is still running. Check the automation server for status: {}",
                e
            );
            executions::set_advisory(&state.pool, execution.id, &advisory).await?;
            (
                "running".to_string(),
                "Automation started successfully".to_string(),
                None,
            )
        }
    };

    catalog::increment_runs(&state.pool, &item.id).await?;
    record_run_activity(
        state,
        item,
        &unique_id,
        &executed_by,
        &status_label,
        &format!(
            "Executed automation \"{}\" ({}) with job id {}",
            item.name, unique_id, awx_job_id
        ),
    )
    .await;

    Ok(RunOutcome {
        success: status_label != "failed",
        message,
        data: RunData {
            unique_id,
            execution_id: execution.id,
            awx_job_id: Some(awx_job_id),
            status: status_label,
            request_body,
            extra_vars,
            artifacts,
            curl_command: curl,
        },
    })
}

/// Launch a catalog item on behalf of a schedule
pub async fn run_scheduled(
    state: &AppState,
    schedule_id: i64,
    catalog_id: &str,
    parameters: &Value,
) -> Result<()> {
    use autoportal_database::queries::schedules;

    let item = catalog::get_catalog_item(&state.pool, catalog_id).await?;

    let request = RunRequest {
        parameters: parameters
            .as_object()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
        custom_body_override: None,
        user: Some(CurrentUser {
            name: Some("scheduler".to_string()),
            ..Default::default()
        }),
        reserved_task_id: None,
    };

    schedules::touch_last_run(&state.pool, schedule_id).await?;

    let cancel = state.shutdown.child_token();
    let outcome = run_catalog_item(state, &item, &request, &cancel).await?;
    info!(
        schedule_id,
        unique_id = %outcome.data.unique_id,
        status = %outcome.data.status,
        "Scheduled execution finished"
    );
    Ok(())
}

/// Create the execution row, regenerating the run id on a collision
/// with a stale reservation.
async fn create_execution_record(
    state: &AppState,
    item: &CatalogItem,
    request: &RunRequest,
    executed_by: &str,
) -> Result<(autoportal_database::Execution, String)> {
    let parameters = serde_json::to_string(&request.parameters).ok();
    let mut unique_id = match &request.reserved_task_id {
        Some(reserved) if !reserved.is_empty() => reserved.clone(),
        _ => run_counters::reserve_run_id(&state.pool, request.user.as_ref()).await?,
    };

    for attempt in 0..MAX_ID_ATTEMPTS {
        match executions::create_execution(
            &state.pool,
            &CreateExecution {
                catalog_id: item.id.clone(),
                unique_id: unique_id.clone(),
                executed_by: executed_by.to_string(),
                parameters: parameters.clone(),
            },
        )
        .await
        {
            Ok(execution) => return Ok((execution, unique_id)),
            Err(e) if attempt + 1 < MAX_ID_ATTEMPTS => {
                warn!(unique_id = %unique_id, error = %e, "Run id already used, reserving a new one");
                unique_id = run_counters::reserve_run_id(&state.pool, request.user.as_ref()).await?;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("execution create loop returns within MAX_ID_ATTEMPTS")
}

/// Resolve the request body for this invocation.
///
/// An explicit override from the JSON editor wins, then the item's own
/// template, then form mode. Form mode additionally carries the item's
/// instance group when one is configured.
fn resolve_body(item: &CatalogItem, request: &RunRequest) -> Result<Value> {
    if let Some(override_body) = request
        .custom_body_override
        .as_deref()
        .filter(|b| !b.trim().is_empty())
    {
        return serde_json::from_str(override_body).map_err(|e| {
            Error::TemplateResolution(format!("invalid custom body override: {}", e))
        });
    }

    let custom_body = item.custom_body.as_deref().filter(|b| !b.trim().is_empty());
    let mut body = template::resolve_request_body(
        custom_body,
        item.inventory_id.as_deref(),
        &request.parameters,
    )?;

    if custom_body.is_none() {
        if let Some(group) = item
            .instance_group_id
            .as_deref()
            .and_then(|g| g.parse::<i64>().ok())
        {
            body["instance_groups"] = json!([group]);
        }
    }

    Ok(body)
}

/// Fetch artifacts and output of a finished job; both are best-effort
async fn collect_artifacts(state: &AppState, job_id: i64) -> Value {
    let artifacts = state
        .awx
        .get_job_artifacts(job_id, None)
        .await
        .unwrap_or_default();
    let output = state.awx.get_job_output(job_id, None).await.ok();

    json!({
        "artifacts": artifacts.artifacts,
        "result_traceback": artifacts.result_traceback,
        "job_explanation": artifacts.job_explanation,
        "job_output": output,
        "fetched_at": Utc::now(),
    })
}

async fn record_run_activity(
    state: &AppState,
    item: &CatalogItem,
    unique_id: &str,
    executed_by: &str,
    status: &str,
    description: &str,
) {
    let result = activity::record_activity(
        &state.pool,
        &CreateActivity {
            action: "executed".to_string(),
            entity_type: "catalog".to_string(),
            entity_id: item.id.clone(),
            entity_name: item.name.clone(),
            description: description.to_string(),
            performed_by: executed_by.to_string(),
            metadata: Some(json!({
                "uniqueId": unique_id,
                "status": status,
            })),
        },
    )
    .await;

    if let Err(e) = result {
        warn!(error = %e, "Failed to record activity entry");
    }
}
