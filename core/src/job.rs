//! Remote job types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Remote job status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Waiting,
    Running,
    Successful,
    Failed,
    Error,
    Canceled,
    /// Any status string this build does not know about
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Parse status from string
    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "waiting" => Self::Waiting,
            "running" => Self::Running,
            "successful" => Self::Successful,
            "failed" => Self::Failed,
            "error" => Self::Error,
            "canceled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    /// Convert status to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }

    /// A job in a terminal status never changes again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Successful | Self::Failed | Self::Error | Self::Canceled
        )
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Successful)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized view of a launched remote job
///
/// Produced by the launch client and refreshed by the poller. Fields the
/// remote server sends beyond the normalized set are kept in `extra` so
/// nothing is lost between launch and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: i64,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl JobDescriptor {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Successful.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Waiting.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn unknown_status_strings_deserialize() {
        let descriptor: JobDescriptor =
            serde_json::from_str(r#"{"id": 7, "status": "never updated"}"#).unwrap();
        assert_eq!(descriptor.status, JobStatus::Unknown);
        assert!(!descriptor.is_terminal());
    }

    #[test]
    fn remote_extras_survive_a_round_trip() {
        let raw = r#"{
            "id": 99,
            "status": "running",
            "launch_type": "manual",
            "playbook": "site.yml"
        }"#;
        let descriptor: JobDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(descriptor.extra.get("playbook").unwrap(), "site.yml");

        let back = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(back["launch_type"], "manual");
    }
}
