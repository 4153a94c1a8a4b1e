use autoportal_core::{Error, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::{CreateSchedule, ExecutionSchedule};

const SCHEDULE_COLUMNS: &str =
    "id, catalog_id, name, cron_expr, enabled, parameters, last_run_at, created_at";

/// List schedules for one catalog item
pub async fn list_schedules(pool: &Pool<Sqlite>, catalog_id: &str) -> Result<Vec<ExecutionSchedule>> {
    sqlx::query_as::<_, ExecutionSchedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE catalog_id = ? ORDER BY name"
    ))
    .bind(catalog_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list schedules: {}", e)))
}

/// List enabled schedules across all catalog items (scheduler startup)
pub async fn list_enabled_schedules(pool: &Pool<Sqlite>) -> Result<Vec<ExecutionSchedule>> {
    sqlx::query_as::<_, ExecutionSchedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE enabled = 1 ORDER BY id"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list enabled schedules: {}", e)))
}

/// Get schedule by id
pub async fn get_schedule(pool: &Pool<Sqlite>, id: i64) -> Result<ExecutionSchedule> {
    sqlx::query_as::<_, ExecutionSchedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to get schedule: {}", e)))
}

/// Create a schedule for a catalog item
pub async fn create_schedule(
    pool: &Pool<Sqlite>,
    catalog_id: &str,
    input: &CreateSchedule,
) -> Result<ExecutionSchedule> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO schedules (catalog_id, name, cron_expr, enabled, parameters)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(catalog_id)
    .bind(&input.name)
    .bind(&input.cron_expr)
    .bind(input.enabled)
    .bind(input.parameters_string())
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to create schedule: {}", e)))?;

    get_schedule(pool, id).await
}

/// Enable or disable a schedule
pub async fn set_enabled(pool: &Pool<Sqlite>, id: i64, enabled: bool) -> Result<()> {
    sqlx::query("UPDATE schedules SET enabled = ? WHERE id = ?")
        .bind(enabled)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to toggle schedule: {}", e)))?;

    Ok(())
}

/// Stamp the last launch time
pub async fn touch_last_run(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    sqlx::query("UPDATE schedules SET last_run_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to stamp schedule run: {}", e)))?;

    Ok(())
}

/// Delete a schedule
pub async fn delete_schedule(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM schedules WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to delete schedule: {}", e)))?;

    Ok(())
}
