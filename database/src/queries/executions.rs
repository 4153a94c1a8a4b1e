use autoportal_core::{Error, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::{CreateExecution, Execution, ExecutionStatus};

const EXECUTION_COLUMNS: &str = r#"
    id, catalog_id, unique_id, status, executed_by, parameters, request_body,
    awx_job_id, result, artifacts, error_message, started_at, completed_at
"#;

/// Create an execution record in `pending` state
pub async fn create_execution(pool: &Pool<Sqlite>, input: &CreateExecution) -> Result<Execution> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO executions (catalog_id, unique_id, status, executed_by, parameters)
        VALUES (?, ?, 'pending', ?, ?)
        RETURNING id
        "#,
    )
    .bind(&input.catalog_id)
    .bind(&input.unique_id)
    .bind(&input.executed_by)
    .bind(&input.parameters)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to create execution: {}", e)))?;

    get_execution(pool, id).await
}

/// Get execution by id
pub async fn get_execution(pool: &Pool<Sqlite>, id: i64) -> Result<Execution> {
    sqlx::query_as::<_, Execution>(&format!(
        "SELECT {EXECUTION_COLUMNS} FROM executions WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to get execution: {}", e)))
}

/// List executions, newest first, optionally scoped to a catalog item
pub async fn list_executions(
    pool: &Pool<Sqlite>,
    catalog_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Execution>> {
    let query = format!(
        r#"
        SELECT {EXECUTION_COLUMNS}
        FROM executions
        {}
        ORDER BY started_at DESC
        LIMIT ? OFFSET ?
        "#,
        if catalog_id.is_some() {
            "WHERE catalog_id = ?"
        } else {
            ""
        }
    );

    let mut q = sqlx::query_as::<_, Execution>(&query);
    if let Some(catalog_id) = catalog_id {
        q = q.bind(catalog_id);
    }

    q.bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list executions: {}", e)))
}

/// Count executions
pub async fn count_executions(pool: &Pool<Sqlite>, catalog_id: Option<&str>) -> Result<i64> {
    let query = format!(
        "SELECT COUNT(*) FROM executions {}",
        if catalog_id.is_some() {
            "WHERE catalog_id = ?"
        } else {
            ""
        }
    );

    let mut q = sqlx::query_scalar::<_, i64>(&query);
    if let Some(catalog_id) = catalog_id {
        q = q.bind(catalog_id);
    }

    q.fetch_one(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to count executions: {}", e)))
}

/// Move an execution to a new status
pub async fn set_status(pool: &Pool<Sqlite>, id: i64, status: ExecutionStatus) -> Result<()> {
    sqlx::query("UPDATE executions SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to update execution status: {}", e)))?;

    Ok(())
}

/// Record the resolved request body and remote job id after launch
pub async fn set_launched(
    pool: &Pool<Sqlite>,
    id: i64,
    request_body: &str,
    awx_job_id: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE executions
        SET status = 'running', request_body = ?, awx_job_id = ?
        WHERE id = ?
        "#,
    )
    .bind(request_body)
    .bind(awx_job_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to record launch: {}", e)))?;

    Ok(())
}

/// Close out an execution with its final state
pub async fn complete(
    pool: &Pool<Sqlite>,
    id: i64,
    status: ExecutionStatus,
    result: Option<&str>,
    artifacts: Option<&str>,
    error_message: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE executions
        SET status = ?, result = ?, artifacts = ?, error_message = ?, completed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(result)
    .bind(artifacts)
    .bind(error_message)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to complete execution: {}", e)))?;

    Ok(())
}

/// Leave an execution running with an advisory message (poll deadline
/// passed but the remote job may still finish)
pub async fn set_advisory(pool: &Pool<Sqlite>, id: i64, message: &str) -> Result<()> {
    sqlx::query("UPDATE executions SET status = 'running', error_message = ? WHERE id = ?")
        .bind(message)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to record advisory: {}", e)))?;

    Ok(())
}
