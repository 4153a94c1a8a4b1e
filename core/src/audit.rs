//! Durable launch audit log
//!
//! Append-only JSON-lines file recording every launch attempt, success,
//! and failure with structured context. Writes never fail the caller:
//! an unwritable sink is reported through a low-priority tracing event
//! and otherwise swallowed, so audit trouble cannot take a launch down.
//! A small reader interface backs the operator-facing log viewer.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Audit entry severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub context: Value,
}

/// Append-only audit sink over a JSON-lines file
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    /// Open (or create) the audit log at `path`, creating parent
    /// directories as needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!("Failed to create audit log directory: {}", e))
                })?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an informational entry
    pub fn info(&self, message: &str, context: Value) {
        self.append(LogLevel::Info, message, context);
    }

    /// Record a warning entry
    pub fn warning(&self, message: &str, context: Value) {
        self.append(LogLevel::Warning, message, context);
    }

    /// Record an error entry
    pub fn error(&self, message: &str, context: Value) {
        self.append(LogLevel::Error, message, context);
    }

    fn append(&self, level: LogLevel, message: &str, context: Value) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            context,
        };

        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "Failed to serialize audit entry");
                return;
            }
        };

        let _guard = self.write_lock.lock().expect("audit write lock poisoned");
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", line));

        if let Err(e) = result {
            debug!(path = ?self.path, error = %e, "Failed to write audit entry");
        }
    }

    /// Read entries, newest first, optionally filtered by level.
    /// Lines that fail to parse are skipped.
    pub fn list(&self, level: Option<LogLevel>, limit: usize) -> Result<Vec<LogEntry>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries: Vec<LogEntry> = BufReader::new(file)
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .filter(|entry: &LogEntry| level.map_or(true, |l| entry.level == l))
            .collect();

        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Truncate the log file
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().expect("audit write lock poisoned");
        File::create(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sink() -> (tempfile::TempDir, AuditLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log")).unwrap();
        (dir, log)
    }

    #[test]
    fn entries_round_trip_newest_first() {
        let (_dir, log) = sink();
        log.info("launch attempted", json!({"template_id": "42"}));
        log.error("launch failed", json!({"errorType": "dns"}));

        let entries = log.list(None, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "launch failed");
        assert_eq!(entries[0].context["errorType"], "dns");
        assert_eq!(entries[1].level, LogLevel::Info);
    }

    #[test]
    fn level_filter_and_limit_apply() {
        let (_dir, log) = sink();
        for i in 0..5 {
            log.info(&format!("attempt {}", i), Value::Null);
        }
        log.error("boom", Value::Null);

        let errors = log.list(Some(LogLevel::Error), 10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "boom");

        let limited = log.list(None, 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].message, "boom");
    }

    #[test]
    fn clear_truncates() {
        let (_dir, log) = sink();
        log.info("something", Value::Null);
        log.clear().unwrap();
        assert!(log.list(None, 10).unwrap().is_empty());
    }

    #[test]
    fn missing_file_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("never-written.log")).unwrap();
        assert!(log.list(None, 10).unwrap().is_empty());
    }

    #[test]
    fn writes_to_an_unwritable_sink_do_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the log path makes every append fail
        let path = dir.path().join("audit.log");
        std::fs::create_dir(&path).unwrap();
        let log = AuditLog::new(&path).unwrap();
        log.error("swallowed", Value::Null);
    }
}
