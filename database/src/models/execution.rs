use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Execution status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Parse status from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Convert status to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if status indicates completion
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// Execution model - one launch attempt of a catalog item
///
/// The resolved request body and the reserved run identifier are
/// persisted here so a failed launch can be diagnosed without
/// reproducing it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Execution {
    pub id: i64,
    pub catalog_id: String,
    /// Reserved run identifier, e.g. RUN02-00017
    pub unique_id: String,

    #[sqlx(rename = "status")]
    pub status_str: String,
    pub executed_by: String,

    /// Submitted form values, JSON
    pub parameters: Option<String>,
    /// Resolved request body as sent to the remote server, JSON
    pub request_body: Option<String>,
    /// Remote job id once launched
    pub awx_job_id: Option<String>,
    /// Final job descriptor, JSON
    pub result: Option<String>,
    /// Artifacts and job output, JSON
    pub artifacts: Option<String>,
    pub error_message: Option<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Execution {
    /// Get status as enum
    pub fn status(&self) -> Option<ExecutionStatus> {
        ExecutionStatus::from_str(&self.status_str)
    }

    /// Get submitted parameters as JSON value
    pub fn get_parameters(&self) -> JsonValue {
        self.parameters
            .as_ref()
            .and_then(|p| serde_json::from_str(p).ok())
            .unwrap_or(JsonValue::Object(serde_json::Map::new()))
    }

    /// Check if the execution is still running
    pub fn is_running(&self) -> bool {
        matches!(
            self.status(),
            Some(ExecutionStatus::Pending) | Some(ExecutionStatus::Running)
        )
    }

    /// Wall-clock duration once complete
    pub fn duration_seconds(&self) -> Option<f64> {
        self.completed_at.map(|completed| {
            completed
                .signed_duration_since(self.started_at)
                .num_milliseconds() as f64
                / 1000.0
        })
    }
}

/// Input for creating a new execution record
#[derive(Debug, Clone)]
pub struct CreateExecution {
    pub catalog_id: String,
    pub unique_id: String,
    pub executed_by: String,
    pub parameters: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Success,
            ExecutionStatus::Failed,
            ExecutionStatus::Cancelled,
        ] {
            assert_eq!(ExecutionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ExecutionStatus::from_str("bogus"), None);

        assert!(!ExecutionStatus::Running.is_complete());
        assert!(ExecutionStatus::Success.is_complete());
        assert!(ExecutionStatus::Failed.is_complete());
    }

    #[test]
    fn duration_requires_completion() {
        let started = Utc::now();
        let mut execution = Execution {
            id: 1,
            catalog_id: "c-1".to_string(),
            unique_id: "RUN00-00001".to_string(),
            status_str: "running".to_string(),
            executed_by: "jdoe".to_string(),
            parameters: Some(r#"{"host":"srv1"}"#.to_string()),
            request_body: None,
            awx_job_id: None,
            result: None,
            artifacts: None,
            error_message: None,
            started_at: started,
            completed_at: None,
        };

        assert!(execution.is_running());
        assert!(execution.duration_seconds().is_none());
        assert_eq!(execution.get_parameters()["host"], "srv1");

        execution.status_str = "success".to_string();
        execution.completed_at = Some(started + chrono::Duration::seconds(12));
        assert!(!execution.is_running());
        assert_eq!(execution.duration_seconds(), Some(12.0));
    }
}
