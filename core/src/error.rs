//! Error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("Template syntax error: {0}")]
    TemplateSyntax(String),

    #[error("Template resolution error: {0}")]
    TemplateResolution(String),

    #[error("{0}")]
    Launch(#[from] ClassifiedError),

    #[error("Job {job_id} did not complete within {max_wait_seconds} seconds")]
    PollTimeout { job_id: i64, max_wait_seconds: u64 },

    #[error("Polling was cancelled before the job reached a terminal state")]
    PollCancelled,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

// Convert anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl Error {
    /// The classified error carried by a launch failure, if any
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Error::Launch(c) => Some(c),
            _ => None,
        }
    }

    /// True for failures raised before anything was sent to the remote server
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::TemplateSyntax(_) | Error::TemplateResolution(_) | Error::Config(_)
        )
    }
}

/// Classified remote-call failure kind
///
/// Downstream log analysis and UI messaging key off these values; the
/// set and its serialized names are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    Authorization,
    NotFound,
    Validation,
    Connection,
    Dns,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// Wire/string form of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Connection => "connection",
            Self::Dns => "dns",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Operator-facing remediation hint, shown next to the classified
    /// message
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::Authentication => Some(
                "Check the API token in settings; verify it has write scope and has not expired",
            ),
            Self::Authorization => {
                Some("Confirm the account behind the token may launch this job template")
            }
            Self::NotFound => Some("Verify the template id exists on the automation server"),
            Self::Validation => {
                Some("Review the form inputs against the variables the template expects")
            }
            Self::Connection => {
                Some("Verify the automation server is running and reachable from this host")
            }
            Self::Dns => Some("Check the base URL hostname in settings"),
            Self::Timeout => {
                Some("The automation server may be under load; retry or raise the request timeout")
            }
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified remote-call failure
///
/// Created once per failed call by [`crate::classify::classify`] and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    #[serde(rename = "errorType")]
    pub kind: ErrorKind,
    pub message: String,
    /// Raw upstream detail (response body, network error text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}
