use autoportal_core::{CurrentUser, Error, Result};
use chrono::{Datelike, Utc};
use sqlx::{Pool, Sqlite};

use crate::models::run_counter::{format_run_id, pool_for_user};

/// Reserve the next run id for a user.
///
/// The per-(year, pool) sequence is advanced atomically with an upsert,
/// so concurrent reservations never collide.
pub async fn reserve_run_id(pool: &Pool<Sqlite>, user: Option<&CurrentUser>) -> Result<String> {
    let year = Utc::now().year() as i64;

    let id_pool = match user {
        Some(user) => pool_for_user(
            user.id.as_deref().or(user.email.as_deref()),
            &user.groups,
        ),
        None => "00",
    };

    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO run_counters (year, pool, sequence, last_used)
        VALUES (?, ?, 1, CURRENT_TIMESTAMP)
        ON CONFLICT(year, pool) DO UPDATE SET
            sequence = sequence + 1,
            last_used = CURRENT_TIMESTAMP
        RETURNING sequence
        "#,
    )
    .bind(year)
    .bind(id_pool)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to reserve run id: {}", e)))?;

    Ok(format_run_id(id_pool, sequence))
}
