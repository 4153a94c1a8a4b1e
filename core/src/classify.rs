//! Remote failure classification
//!
//! Failures from the orchestration server are adapted into
//! [`UpstreamError`] at the HTTP boundary, then mapped onto the stable
//! [`ErrorKind`] taxonomy by [`classify`]. The mapping is deterministic
//! and evaluated in a fixed priority order.

use serde_json::Value;

use crate::error::{ClassifiedError, ErrorKind};

/// Known upstream failure shapes, built by the HTTP-client adapter
#[derive(Debug, Clone)]
pub enum UpstreamError {
    /// The server answered with a non-success status
    HttpStatus { status: u16, body: Option<Value> },
    /// The request never produced an HTTP response
    Network {
        kind: NetworkErrorKind,
        detail: String,
    },
    /// Anything else that carries only a message
    Generic { message: String },
}

/// Transport-level failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    ConnectionRefused,
    DnsFailure,
    TimedOut,
    Other,
}

impl UpstreamError {
    /// Adapt a `reqwest` transport error into an [`UpstreamError`]
    ///
    /// Status errors are not handled here: the client reads the response
    /// body before classification and builds `HttpStatus` directly.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let detail = err.to_string();

        if err.is_timeout() {
            return UpstreamError::Network {
                kind: NetworkErrorKind::TimedOut,
                detail,
            };
        }

        if err.is_connect() || err.is_request() {
            return UpstreamError::Network {
                kind: network_kind_from_source(err),
                detail,
            };
        }

        UpstreamError::Generic { message: detail }
    }
}

/// Walk the error source chain to tell connection refusals, DNS
/// failures, and timeouts apart. reqwest wraps the underlying
/// `std::io::Error`, so the io error kind is the reliable signal where
/// one exists; DNS resolution failures only surface as message text.
fn network_kind_from_source(err: &reqwest::Error) -> NetworkErrorKind {
    let mut source: Option<&(dyn std::error::Error + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    return NetworkErrorKind::ConnectionRefused
                }
                std::io::ErrorKind::TimedOut => return NetworkErrorKind::TimedOut,
                _ => {}
            }
        }
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns") || text.contains("lookup") || text.contains("resolve") {
            return NetworkErrorKind::DnsFailure;
        }
        if text.contains("connection refused") {
            return NetworkErrorKind::ConnectionRefused;
        }
        source = cause.source();
    }
    NetworkErrorKind::Other
}

use std::error::Error as _;

/// Context for rendering classified messages
#[derive(Debug, Clone, Default)]
pub struct ClassifyContext {
    pub base_url: String,
    pub template_id: Option<String>,
}

impl ClassifyContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            template_id: None,
        }
    }

    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }
}

/// Map an upstream failure onto the classified taxonomy
pub fn classify(upstream: &UpstreamError, ctx: &ClassifyContext) -> ClassifiedError {
    match upstream {
        UpstreamError::HttpStatus { status, body } => classify_http(*status, body.as_ref(), ctx),
        UpstreamError::Network { kind, detail } => classify_network(*kind, detail, ctx),
        UpstreamError::Generic { message } => {
            ClassifiedError::new(ErrorKind::Unknown, message.clone())
        }
    }
}

fn classify_http(status: u16, body: Option<&Value>, ctx: &ClassifyContext) -> ClassifiedError {
    match status {
        401 => {
            let mut err = ClassifiedError::new(
                ErrorKind::Authentication,
                "token is not matching / invalid or expired",
            );
            if let Some(body) = body {
                err = err.with_detail(body.clone());
            }
            err
        }
        403 => {
            let mut err = ClassifiedError::new(
                ErrorKind::Authorization,
                "access denied - insufficient permission to launch this template",
            );
            if let Some(body) = body {
                err = err.with_detail(body.clone());
            }
            err
        }
        404 => {
            let template = ctx.template_id.as_deref().unwrap_or("?");
            let mut err = ClassifiedError::new(
                ErrorKind::NotFound,
                format!("job template '{}' not found on server", template),
            );
            if let Some(body) = body {
                err = err.with_detail(body.clone());
            }
            err
        }
        _ => match body {
            Some(body) => classify_validation_body(body),
            None => ClassifiedError::new(
                ErrorKind::Unknown,
                format!("server returned HTTP {} with no response body", status),
            ),
        },
    }
}

/// Validation payloads either carry a single `detail` string or a map of
/// per-field message lists, mirroring the AWX error format.
fn classify_validation_body(body: &Value) -> ClassifiedError {
    if let Some(detail) = body.get("detail").and_then(Value::as_str) {
        return ClassifiedError::new(ErrorKind::Validation, detail.to_string())
            .with_detail(body.clone());
    }

    if let Some(map) = body.as_object() {
        let mut parts = Vec::with_capacity(map.len());
        for (field, messages) in map {
            let rendered = match messages {
                Value::Array(items) => items
                    .iter()
                    .map(|m| match m {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            parts.push(format!("{}: {}", field, rendered));
        }
        if !parts.is_empty() {
            return ClassifiedError::new(ErrorKind::Validation, parts.join("; "))
                .with_detail(body.clone());
        }
    }

    ClassifiedError::new(
        ErrorKind::Unknown,
        "the automation server rejected the request without an identifiable reason",
    )
    .with_detail(body.clone())
}

fn classify_network(
    kind: NetworkErrorKind,
    detail: &str,
    ctx: &ClassifyContext,
) -> ClassifiedError {
    let err = match kind {
        NetworkErrorKind::ConnectionRefused => ClassifiedError::new(
            ErrorKind::Connection,
            format!("cannot connect to server at {}", ctx.base_url),
        ),
        NetworkErrorKind::DnsFailure => ClassifiedError::new(
            ErrorKind::Dns,
            format!("cannot resolve hostname at {}", ctx.base_url),
        ),
        NetworkErrorKind::TimedOut => {
            ClassifiedError::new(ErrorKind::Timeout, "connection timed out")
        }
        NetworkErrorKind::Other => ClassifiedError::new(ErrorKind::Unknown, detail.to_string()),
    };
    err.with_detail(Value::String(detail.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ClassifyContext {
        ClassifyContext::new("https://awx.internal/api/v2").with_template("42")
    }

    #[test]
    fn http_401_is_authentication() {
        let err = classify(
            &UpstreamError::HttpStatus {
                status: 401,
                body: Some(json!({"detail": "Invalid token"})),
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "token is not matching / invalid or expired");
    }

    #[test]
    fn http_403_with_empty_body_is_authorization() {
        let err = classify(
            &UpstreamError::HttpStatus {
                status: 403,
                body: Some(json!({})),
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[test]
    fn http_404_names_the_template() {
        let err = classify(
            &UpstreamError::HttpStatus {
                status: 404,
                body: None,
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "job template '42' not found on server");
    }

    #[test]
    fn detail_field_is_used_verbatim() {
        let err = classify(
            &UpstreamError::HttpStatus {
                status: 400,
                body: Some(json!({"detail": "Job cannot start: inventory is pending deletion"})),
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(
            err.message,
            "Job cannot start: inventory is pending deletion"
        );
    }

    #[test]
    fn field_errors_are_concatenated() {
        let err = classify(
            &UpstreamError::HttpStatus {
                status: 400,
                body: Some(json!({"extra_vars": ["must be valid JSON", "too large"]})),
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "extra_vars: must be valid JSON, too large");
    }

    #[test]
    fn connection_refused_maps_to_connection() {
        let err = classify(
            &UpstreamError::Network {
                kind: NetworkErrorKind::ConnectionRefused,
                detail: "tcp connect error".to_string(),
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::Connection);
        assert_eq!(
            err.message,
            "cannot connect to server at https://awx.internal/api/v2"
        );
    }

    #[test]
    fn dns_failure_maps_to_dns() {
        let err = classify(
            &UpstreamError::Network {
                kind: NetworkErrorKind::DnsFailure,
                detail: "failed to lookup address information".to_string(),
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::Dns);
        assert_eq!(
            err.message,
            "cannot resolve hostname at https://awx.internal/api/v2"
        );
    }

    #[test]
    fn network_timeout_maps_to_timeout() {
        let err = classify(
            &UpstreamError::Network {
                kind: NetworkErrorKind::TimedOut,
                detail: "operation timed out".to_string(),
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.message, "connection timed out");
    }

    #[test]
    fn generic_message_passes_through_as_unknown() {
        let err = classify(
            &UpstreamError::Generic {
                message: "builder error".to_string(),
            },
            &ctx(),
        );
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "builder error");
    }

    #[test]
    fn classification_is_deterministic() {
        let upstream = UpstreamError::HttpStatus {
            status: 400,
            body: Some(json!({"inventory": ["not found"]})),
        };
        let a = classify(&upstream, &ctx());
        let b = classify(&upstream, &ctx());
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.message, b.message);
    }
}
