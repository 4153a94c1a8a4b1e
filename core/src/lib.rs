//! Core library for Autoportal
//!
//! This crate defines the AWX client, request-body resolution, error
//! classification, polling, and audit types used across all Autoportal
//! components.

pub mod audit;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod poll;
pub mod template;

// Re-exports
pub use audit::{AuditLog, LogEntry, LogLevel};
pub use classify::{classify, ClassifyContext, NetworkErrorKind, UpstreamError};
pub use client::{
    curl_command, AwxClient, EndpointOverride, InventorySummary, JobArtifacts, JobTemplateSummary,
};
pub use config::{
    AwxConfig, ConfigProvider, Endpoint, SettingsResolver, SettingsStore, StaticProvider,
    PLACEHOLDER_BASE_URL, SETTING_API_ENDPOINT, SETTING_AWX_TOKEN,
};
pub use error::{ClassifiedError, Error, ErrorKind, Result};
pub use job::{JobDescriptor, JobStatus};
pub use poll::{poll_until_complete, JobStatusSource, DEFAULT_INTERVAL, DEFAULT_MAX_WAIT};
pub use template::{
    initial_value, resolve_predefined, resolve_request_body, template_variables, validate_schema,
    CurrentUser, FieldType, FormField,
};
