use autoportal_core::{Error, Result};
use sqlx::{Pool, Sqlite};

use crate::models::{Activity, CreateActivity};

/// Record an activity entry
pub async fn record_activity(pool: &Pool<Sqlite>, input: &CreateActivity) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO activities
            (action, entity_type, entity_id, entity_name, description, performed_by, metadata)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.action)
    .bind(&input.entity_type)
    .bind(&input.entity_id)
    .bind(&input.entity_name)
    .bind(&input.description)
    .bind(&input.performed_by)
    .bind(input.metadata_string())
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to record activity: {}", e)))?;

    Ok(())
}

/// List recent activities, newest first
pub async fn list_activities(pool: &Pool<Sqlite>, limit: i64, offset: i64) -> Result<Vec<Activity>> {
    sqlx::query_as::<_, Activity>(
        r#"
        SELECT id, action, entity_type, entity_id, entity_name, description,
               performed_by, metadata, created_at
        FROM activities
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list activities: {}", e)))
}
