//! Orchestration server client
//!
//! All remote operations against the AWX-compatible automation server:
//! launching job templates, job status/output/cancel, and the listings
//! the catalog designer needs. Connection settings come from an
//! injected [`ConfigProvider`]; explicit per-call overrides win over it.
//! When no real endpoint is configured every operation short-circuits
//! into demo mode and synthesizes a successful response without any
//! network I/O, so the console can be exercised end to end against an
//! unconfigured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::audit::AuditLog;
use crate::classify::{classify, ClassifyContext, UpstreamError};
use crate::config::{ConfigProvider, Endpoint};
use crate::error::{Error, Result};
use crate::job::{JobDescriptor, JobStatus};
use crate::poll::{poll_until_complete, JobStatusSource};

/// Request timeout for all remote calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call endpoint override; explicit values beat the provider and
/// empty strings are treated as unset
#[derive(Debug, Clone, Default)]
pub struct EndpointOverride {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl EndpointOverride {
    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Job template listing entry from `GET /job_templates/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplateSummary {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Inventory listing entry from `GET /inventories/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySummary {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Artifact projection of a finished job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobArtifacts {
    #[serde(default)]
    pub artifacts: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_traceback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// List envelope used by the remote API
#[derive(Debug, Deserialize)]
struct ResourceList<T> {
    results: Vec<T>,
}

/// Client for the remote orchestration API
pub struct AwxClient {
    http: reqwest::Client,
    provider: Arc<dyn ConfigProvider>,
    audit: Option<Arc<AuditLog>>,
}

impl AwxClient {
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            http,
            provider,
            audit: None,
        }
    }

    /// Attach the durable audit sink; launch failures are recorded there
    /// with full upstream context.
    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Effective endpoint for one call: override values beat provider
    /// values, then the demo/real decision is made centrally.
    async fn endpoint(&self, overrides: Option<&EndpointOverride>) -> Result<Endpoint> {
        let needs_provider = overrides
            .map(|o| o.base_url().is_none() || o.token().is_none())
            .unwrap_or(true);

        let config = if needs_provider {
            self.provider.get_config().await?
        } else {
            Default::default()
        };

        let base_url = overrides
            .and_then(|o| o.base_url())
            .map(str::to_string)
            .or_else(|| Some(config.base_url.clone()).filter(|s| !s.is_empty()));
        let token = overrides
            .and_then(|o| o.token())
            .map(str::to_string)
            .or_else(|| Some(config.token.clone()).filter(|s| !s.is_empty()));

        Endpoint::resolve(base_url.as_deref(), token.as_deref()).map_err(Error::Launch)
    }

    /// Launch a job template with the resolved request body.
    ///
    /// Demo mode returns a synthetic successful descriptor with the
    /// submitted body merged in for echo/debugging. Real failures are
    /// classified, logged with full context, and returned; there are no
    /// automatic retries.
    pub async fn launch_job_template(
        &self,
        template_id: &str,
        body: &Value,
        overrides: Option<&EndpointOverride>,
    ) -> Result<JobDescriptor> {
        let (base_url, token) = match self.endpoint(overrides).await? {
            Endpoint::Demo => {
                info!(template_id = %template_id, "No automation server configured, simulating launch");
                return Ok(self.synthesize_launch(template_id, body));
            }
            Endpoint::Real { base_url, token } => (base_url, token),
        };

        let ctx = ClassifyContext::new(&base_url).with_template(template_id);
        let url = format!("{}/job_templates/{}/launch/", base_url, template_id);
        info!(url = %url, template_id = %template_id, "Launching job template");

        let response = match self.http.post(&url).bearer_auth(&token).json(body).send().await {
            Ok(response) => response,
            Err(e) => {
                let upstream = UpstreamError::from_reqwest(&e);
                return Err(self.launch_failure(&ctx, &upstream, body));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let payload = response.json::<Value>().await.ok();
            let upstream = UpstreamError::HttpStatus {
                status: status.as_u16(),
                body: payload,
            };
            return Err(self.launch_failure(&ctx, &upstream, body));
        }

        let descriptor: JobDescriptor = response
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid launch response: {}", e)))?;

        info!(job_id = descriptor.id, template_id = %template_id, "Job launched");
        Ok(descriptor)
    }

    /// Classify, log, and audit a failed launch call
    fn launch_failure(
        &self,
        ctx: &ClassifyContext,
        upstream: &UpstreamError,
        body: &Value,
    ) -> Error {
        let classified = classify(upstream, ctx);
        error!(
            server = %ctx.base_url,
            template_id = ctx.template_id.as_deref().unwrap_or("?"),
            error_type = %classified.kind,
            message = %classified.message,
            "Job launch failed"
        );
        if let Some(audit) = &self.audit {
            audit.error(
                "job launch failed",
                json!({
                    "server": ctx.base_url,
                    "templateId": ctx.template_id,
                    "errorType": classified.kind.as_str(),
                    "message": classified.message,
                    "upstream": classified.detail,
                    "requestBody": body,
                }),
            );
        }
        Error::Launch(classified)
    }

    /// Fetch current status of a remote job
    pub async fn get_job_status(
        &self,
        job_id: i64,
        overrides: Option<&EndpointOverride>,
    ) -> Result<JobDescriptor> {
        let (base_url, token) = match self.endpoint(overrides).await? {
            Endpoint::Demo => return Ok(self.synthesize_status(job_id)),
            Endpoint::Real { base_url, token } => (base_url, token),
        };

        let url = format!("{}/jobs/{}/", base_url, job_id);
        self.get_json(&url, &token, &ClassifyContext::new(&base_url))
            .await
    }

    /// Fetch job output (`stdout` in JSON format)
    pub async fn get_job_output(
        &self,
        job_id: i64,
        overrides: Option<&EndpointOverride>,
    ) -> Result<Value> {
        let (base_url, token) = match self.endpoint(overrides).await? {
            Endpoint::Demo => {
                return Ok(json!({
                    "content": "Simulated execution: no output available"
                }))
            }
            Endpoint::Real { base_url, token } => (base_url, token),
        };

        let url = format!("{}/jobs/{}/stdout/?format=json", base_url, job_id);
        self.get_json(&url, &token, &ClassifyContext::new(&base_url))
            .await
    }

    /// Cancel a running remote job
    pub async fn cancel_job(
        &self,
        job_id: i64,
        overrides: Option<&EndpointOverride>,
    ) -> Result<Value> {
        let (base_url, token) = match self.endpoint(overrides).await? {
            Endpoint::Demo => {
                return Ok(json!({
                    "id": job_id,
                    "status": "canceled",
                    "detail": "Simulated execution: nothing to cancel"
                }))
            }
            Endpoint::Real { base_url, token } => (base_url, token),
        };

        let ctx = ClassifyContext::new(&base_url);
        let url = format!("{}/jobs/{}/cancel/", base_url, job_id);

        let response = match self.http.post(&url).bearer_auth(&token).send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(self.remote_failure(&ctx, &UpstreamError::from_reqwest(&e)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let payload = response.json::<Value>().await.ok();
            return Err(self.remote_failure(
                &ctx,
                &UpstreamError::HttpStatus {
                    status: status.as_u16(),
                    body: payload,
                },
            ));
        }

        // AWX acknowledges cancellation with an empty 202 body
        Ok(response.json::<Value>().await.unwrap_or(Value::Null))
    }

    /// List job templates available on the remote server
    pub async fn list_job_templates(
        &self,
        overrides: Option<&EndpointOverride>,
    ) -> Result<Vec<JobTemplateSummary>> {
        let (base_url, token) = match self.endpoint(overrides).await? {
            Endpoint::Demo => return Ok(Vec::new()),
            Endpoint::Real { base_url, token } => (base_url, token),
        };

        let url = format!("{}/job_templates/", base_url);
        let list: ResourceList<JobTemplateSummary> = self
            .get_json(&url, &token, &ClassifyContext::new(&base_url))
            .await?;
        Ok(list.results)
    }

    /// List inventories available on the remote server
    pub async fn list_inventories(
        &self,
        overrides: Option<&EndpointOverride>,
    ) -> Result<Vec<InventorySummary>> {
        let (base_url, token) = match self.endpoint(overrides).await? {
            Endpoint::Demo => return Ok(Vec::new()),
            Endpoint::Real { base_url, token } => (base_url, token),
        };

        let url = format!("{}/inventories/", base_url);
        let list: ResourceList<InventorySummary> = self
            .get_json(&url, &token, &ClassifyContext::new(&base_url))
            .await?;
        Ok(list.results)
    }

    /// Fetch the artifact projection of a job.
    ///
    /// Artifacts are best-effort decoration of a finished run: real-path
    /// failures are folded into the payload instead of failing the run.
    pub async fn get_job_artifacts(
        &self,
        job_id: i64,
        overrides: Option<&EndpointOverride>,
    ) -> Result<JobArtifacts> {
        let (base_url, token) = match self.endpoint(overrides).await? {
            Endpoint::Demo => {
                return Ok(JobArtifacts {
                    artifacts: json!({
                        "simulated": true,
                        "message": "no automation server configured"
                    }),
                    ..Default::default()
                })
            }
            Endpoint::Real { base_url, token } => (base_url, token),
        };

        let url = format!("{}/jobs/{}/", base_url, job_id);
        let detail: Value = match self
            .get_json(&url, &token, &ClassifyContext::new(&base_url))
            .await
        {
            Ok(detail) => detail,
            Err(e) => {
                debug!(job_id, error = %e, "Failed to fetch job artifacts");
                return Ok(JobArtifacts {
                    artifacts: json!({}),
                    error: Some(e.to_string()),
                    ..Default::default()
                });
            }
        };

        Ok(JobArtifacts {
            artifacts: detail.get("artifacts").cloned().unwrap_or(json!({})),
            result_traceback: detail
                .get("result_traceback")
                .and_then(Value::as_str)
                .map(str::to_string),
            job_explanation: detail
                .get("job_explanation")
                .and_then(Value::as_str)
                .map(str::to_string),
            error: None,
        })
    }

    /// Poll a job until it reaches a terminal status
    pub async fn poll_job_until_complete(
        &self,
        job_id: i64,
        max_wait: Duration,
        interval: Duration,
        overrides: Option<&EndpointOverride>,
        cancel: &CancellationToken,
    ) -> Result<JobDescriptor> {
        let source = ClientStatusSource {
            client: self,
            job_id,
            overrides: overrides.cloned(),
        };
        poll_until_complete(&source, max_wait, interval, cancel).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        ctx: &ClassifyContext,
    ) -> Result<T> {
        let response = match self.http.get(url).bearer_auth(token).send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(self.remote_failure(ctx, &UpstreamError::from_reqwest(&e)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let payload = response.json::<Value>().await.ok();
            return Err(self.remote_failure(
                ctx,
                &UpstreamError::HttpStatus {
                    status: status.as_u16(),
                    body: payload,
                },
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid response from {}: {}", url, e)))
    }

    fn remote_failure(&self, ctx: &ClassifyContext, upstream: &UpstreamError) -> Error {
        let classified = classify(upstream, ctx);
        error!(
            server = %ctx.base_url,
            error_type = %classified.kind,
            message = %classified.message,
            "Remote call failed"
        );
        Error::Launch(classified)
    }

    fn synthesize_launch(&self, template_id: &str, body: &Value) -> JobDescriptor {
        let job_id = rand::thread_rng().gen_range(1000..11000);
        let now = Utc::now();

        let mut extra = Map::new();
        extra.insert("type".to_string(), json!("job"));
        extra.insert("url".to_string(), json!(format!("/api/v2/jobs/{}/", job_id)));
        extra.insert("job_template".to_string(), json!(template_id));
        // Echo the submitted body back so the operator can inspect what
        // would have been sent
        if let Some(map) = body.as_object() {
            for (key, value) in map {
                extra.insert(key.clone(), value.clone());
            }
        }

        JobDescriptor {
            id: job_id,
            status: JobStatus::Successful,
            name: Some(format!("Job {}", job_id)),
            created: Some(now),
            started: Some(now),
            finished: Some(now + chrono::Duration::seconds(5)),
            elapsed: Some(5.234),
            job_explanation: Some(
                "Simulated execution: no automation server is configured".to_string(),
            ),
            artifacts: None,
            extra,
        }
    }

    fn synthesize_status(&self, job_id: i64) -> JobDescriptor {
        let now = Utc::now();
        JobDescriptor {
            id: job_id,
            status: JobStatus::Successful,
            name: None,
            created: None,
            started: Some(now),
            finished: Some(now),
            elapsed: Some(5.234),
            job_explanation: None,
            artifacts: None,
            extra: Map::new(),
        }
    }
}

/// Status source over the client, consumed by the poll loop
struct ClientStatusSource<'a> {
    client: &'a AwxClient,
    job_id: i64,
    overrides: Option<EndpointOverride>,
}

#[async_trait]
impl JobStatusSource for ClientStatusSource<'_> {
    async fn fetch(&self) -> Result<JobDescriptor> {
        self.client
            .get_job_status(self.job_id, self.overrides.as_ref())
            .await
    }

    fn job_id(&self) -> i64 {
        self.job_id
    }
}

/// Render the launch request as a curl command for operator
/// documentation. The token is masked to its first characters.
pub fn curl_command(base_url: &str, template_id: &str, body: &Value, token: &str) -> String {
    let masked = if token.len() > 8 {
        format!("{}...", &token[..8])
    } else if token.is_empty() {
        "[TOKEN]".to_string()
    } else {
        "***".to_string()
    };
    let endpoint = format!(
        "{}/job_templates/{}/launch/",
        base_url.trim_end_matches('/'),
        template_id
    );
    let rendered = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());

    format!(
        "curl -X POST '{}' \\\n  -H 'Authorization: Bearer {}' \\\n  -H 'Content-Type: application/json' \\\n  -d '{}'",
        endpoint, masked, rendered
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AwxConfig, StaticProvider, PLACEHOLDER_BASE_URL};
    use crate::error::ErrorKind;

    fn client(base_url: &str, token: &str) -> AwxClient {
        AwxClient::new(Arc::new(StaticProvider(AwxConfig {
            base_url: base_url.to_string(),
            token: token.to_string(),
        })))
    }

    #[tokio::test]
    async fn demo_launch_is_idempotently_successful() {
        let client = client("", "");
        for _ in 0..3 {
            let descriptor = client
                .launch_job_template("42", &json!({"extra_vars": {"host": "srv1"}}), None)
                .await
                .unwrap();
            assert_eq!(descriptor.status, JobStatus::Successful);
            assert!(descriptor.id >= 1000);
            assert!(descriptor.finished > descriptor.started);
        }
    }

    #[tokio::test]
    async fn placeholder_base_url_stays_in_demo_mode() {
        let client = client(PLACEHOLDER_BASE_URL, "some-token");
        let descriptor = client
            .launch_job_template("42", &json!({}), None)
            .await
            .unwrap();
        assert_eq!(descriptor.status, JobStatus::Successful);
    }

    #[tokio::test]
    async fn demo_launch_echoes_the_request_body() {
        let client = client("", "");
        let descriptor = client
            .launch_job_template("42", &json!({"inventory": "inv-1"}), None)
            .await
            .unwrap();
        assert_eq!(descriptor.extra.get("inventory").unwrap(), "inv-1");
        assert_eq!(descriptor.extra.get("job_template").unwrap(), "42");
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        // A real-looking URL with no token must produce the local
        // authentication error; a connection or dns kind here would mean
        // a network attempt was made.
        let client = client("https://awx.invalid/api/v2", "");
        let err = client
            .launch_job_template("42", &json!({}), None)
            .await
            .unwrap_err();
        let classified = err.classified().expect("launch error is classified");
        assert_eq!(classified.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn override_beats_provider() {
        // Provider points at a real URL; the override drags the call
        // back into demo mode.
        let client = client("https://awx.invalid/api/v2", "tok");
        let overrides = EndpointOverride {
            base_url: Some(PLACEHOLDER_BASE_URL.to_string()),
            token: None,
        };
        let descriptor = client
            .launch_job_template("42", &json!({}), Some(&overrides))
            .await
            .unwrap();
        assert_eq!(descriptor.status, JobStatus::Successful);
    }

    #[tokio::test]
    async fn empty_override_strings_are_unset() {
        let client = client("", "");
        let overrides = EndpointOverride {
            base_url: Some("".to_string()),
            token: Some("".to_string()),
        };
        let descriptor = client
            .launch_job_template("42", &json!({}), Some(&overrides))
            .await
            .unwrap();
        assert_eq!(descriptor.status, JobStatus::Successful);
    }

    #[tokio::test]
    async fn demo_listings_are_empty_and_demo_status_is_terminal() {
        let client = client("", "");
        assert!(client.list_job_templates(None).await.unwrap().is_empty());
        assert!(client.list_inventories(None).await.unwrap().is_empty());

        let status = client.get_job_status(1234, None).await.unwrap();
        assert!(status.is_terminal());

        let artifacts = client.get_job_artifacts(1234, None).await.unwrap();
        assert_eq!(artifacts.artifacts["simulated"], true);
    }

    #[tokio::test]
    async fn demo_poll_finishes_immediately() {
        let client = client("", "");
        let cancel = CancellationToken::new();
        let descriptor = client
            .poll_job_until_complete(
                1234,
                Duration::from_secs(1),
                Duration::from_millis(10),
                None,
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(descriptor.status, JobStatus::Successful);
    }

    #[test]
    fn curl_command_masks_the_token() {
        let rendered = curl_command(
            "https://awx.internal/api/v2/",
            "42",
            &json!({"inventory": "inv-1"}),
            "super-secret-token-value",
        );
        assert!(rendered.contains("https://awx.internal/api/v2/job_templates/42/launch/"));
        assert!(rendered.contains("super-se..."));
        assert!(!rendered.contains("super-secret-token-value"));
        assert!(rendered.contains("\"inventory\""));
    }
}
