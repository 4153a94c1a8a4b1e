//! Configuration management

use autoportal_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Path of the durable launch audit log
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: String,

    /// Environment default for the automation server base URL; the
    /// settings store takes precedence
    #[serde(default)]
    pub awx_base_url: Option<String>,

    /// Environment default for the automation server token
    #[serde(default)]
    pub awx_token: Option<String>,

    /// Optional TTL for the connection-settings cache, in seconds.
    /// Unset means every launch reads the settings store fresh.
    #[serde(default)]
    pub config_cache_ttl_seconds: Option<u64>,
}

fn default_database_url() -> String {
    "sqlite:data/autoportal.db".to_string()
}

fn default_audit_log_path() -> String {
    "logs/automation-audit.log".to_string()
}

impl Config {
    /// Load configuration from file or environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            Self::load_from_file(p)
        } else {
            Self::load_from_env()
        }
    }

    /// Load from configuration file
    fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    fn load_from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url());
        let audit_log_path =
            std::env::var("AUDIT_LOG_PATH").unwrap_or_else(|_| default_audit_log_path());

        let awx_base_url = std::env::var("AWX_BASE_URL").ok().filter(|v| !v.is_empty());
        // Support file-based token (Docker/K8s secrets)
        let awx_token = get_secret("AWX_TOKEN");

        let config_cache_ttl_seconds = std::env::var("CONFIG_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok());

        Ok(Config {
            database_url,
            audit_log_path,
            awx_base_url,
            awx_token,
            config_cache_ttl_seconds,
        })
    }
}

/// Get secret from environment variable or file
///
/// Supports both direct environment variables and file-based secrets
/// (Docker/Kubernetes pattern). If `VAR_NAME` is not found, tries
/// `VAR_NAME_FILE` which should point to a file containing the secret.
pub fn get_secret(var_name: &str) -> Option<String> {
    // Try environment variable first
    if let Ok(value) = std::env::var(var_name) {
        if !value.is_empty() {
            return Some(value);
        }
    }

    // Try file-based secret (Docker secrets / Kubernetes)
    let file_var = format!("{}_FILE", var_name);
    if let Ok(path) = std::env::var(&file_var) {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            return Some(contents.trim().to_string());
        }
    }

    None
}
