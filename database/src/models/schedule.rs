use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::str::FromStr;

/// ExecutionSchedule model - recurring launch of a catalog item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionSchedule {
    pub id: i64,
    pub catalog_id: String,
    pub name: String,
    /// Cron expression
    pub cron_expr: String,
    pub enabled: bool,
    /// Stored form values submitted on each launch, JSON
    pub parameters: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionSchedule {
    /// Get stored parameters as JSON value
    pub fn get_parameters(&self) -> JsonValue {
        self.parameters
            .as_ref()
            .and_then(|p| serde_json::from_str(p).ok())
            .unwrap_or(JsonValue::Object(serde_json::Map::new()))
    }
}

/// Input for creating a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchedule {
    pub name: String,
    pub cron_expr: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub parameters: Option<JsonValue>,
}

fn default_enabled() -> bool {
    true
}

impl CreateSchedule {
    pub fn parameters_string(&self) -> Option<String> {
        self.parameters
            .as_ref()
            .and_then(|p| serde_json::to_string(p).ok())
    }

    /// Validate the input; bad cron expressions never reach the scheduler
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Schedule name cannot be empty".to_string());
        }

        cron::Schedule::from_str(&self.cron_expr)
            .map_err(|e| format!("Invalid cron expression '{}': {}", self.cron_expr, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_expressions_are_validated() {
        let valid = CreateSchedule {
            name: "nightly".to_string(),
            cron_expr: "0 0 2 * * *".to_string(),
            enabled: true,
            parameters: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateSchedule {
            name: "broken".to_string(),
            cron_expr: "every tuesday".to_string(),
            enabled: true,
            parameters: None,
        };
        assert!(invalid.validate().is_err());
    }
}
