//! Database layer with SQLite

use autoportal_core::{Error, Result};
use sqlx::{sqlite::SqlitePool, Pool, Sqlite};
use tracing::info;

// Export models and queries
pub mod models;
pub mod queries;
pub mod settings_store;

pub use models::*;
pub use settings_store::SqliteSettingsStore;

// Re-export sqlx types for convenience
pub use sqlx::{self, Pool as SqlxPool, Sqlite as SqlxSqlite};

// Embed migrations at compile time
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Database connection pool
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_url: &str) -> Result<Self> {
        info!(url = %database_url, "Connecting to database");

        // Make sure the parent directory of a file-backed database exists
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            if path != ":memory:" {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        info!(dir = ?parent, "Creating database directory");
                        std::fs::create_dir_all(parent).map_err(|e| {
                            Error::Database(format!("Failed to create database directory: {}", e))
                        })?;
                    }
                }
            }
        }

        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let pool = if database_url.starts_with("sqlite:") {
            let options = SqliteConnectOptions::from_str(database_url)
                .map_err(|e| Error::Database(format!("Invalid database URL: {}", e)))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal);

            SqlitePool::connect_with(options)
                .await
                .map_err(|e| Error::Database(format!("Failed to connect: {}", e)))?
        } else {
            SqlitePool::connect(database_url)
                .await
                .map_err(|e| Error::Database(format!("Failed to connect: {}", e)))?
        };

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to enable foreign keys: {}", e)))?;

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to run migrations: {}", e)))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the database connection
    pub async fn close(self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
