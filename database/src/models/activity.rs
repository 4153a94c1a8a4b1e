use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Activity model - append-only record of who did what to which entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    /// created / updated / deleted / executed
    pub action: String,
    /// catalog / setting / schedule
    pub entity_type: String,
    pub entity_id: String,
    pub entity_name: String,
    pub description: String,
    pub performed_by: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Get metadata as JSON value
    pub fn get_metadata(&self) -> JsonValue {
        self.metadata
            .as_ref()
            .and_then(|m| serde_json::from_str(m).ok())
            .unwrap_or(JsonValue::Object(serde_json::Map::new()))
    }
}

/// Input for recording an activity
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub entity_name: String,
    pub description: String,
    pub performed_by: String,
    pub metadata: Option<JsonValue>,
}

impl CreateActivity {
    pub fn metadata_string(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| serde_json::to_string(m).ok())
    }
}
