//! Settings store seam implementation
//!
//! Bridges the core configuration resolver onto the SQLite settings
//! table. Reads go to the database every time unless the resolver adds
//! its own TTL cache, so edits in the settings screen take effect on
//! the next launch.

use async_trait::async_trait;
use autoportal_core::{Result, SettingsStore};
use sqlx::{Pool, Sqlite};

use crate::queries::settings;

/// [`SettingsStore`] over the settings table
#[derive(Clone)]
pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        settings::get_setting_value(&self.pool, key).await
    }
}
