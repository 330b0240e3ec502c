//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file yields the production gate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Two mebibytes, the default request body ceiling.
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Oversize body answer used in production.
pub const OVERSIZE_BODY: &str = r#"{"message":"BAD_REQUEST","error": "File size exceeds 2MB limit"}"#;

/// Oversize body answer used by the staging deployment.
pub const OVERSIZE_BODY_VERBOSE: &str =
    r#"{"message":"BAD_REQUEST","error": "Bad Request - File size exceeds 2MB limit"}"#;

/// Localized "system busy" answer substituted for gateway failures.
pub const BUSY_BODY: &str =
    r#"{"error":"SERVER_ERROR","message":"Hệ thống đang bận, vui lòng thử lại sau."}"#;

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, TLS, virtual host).
    pub listener: ListenerConfig,

    /// The single backend every valid request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Upstream failure translation policy.
    pub fallback: FallbackPolicy,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Per-request access log.
    pub access_log: AccessLogConfig,

    /// Shutdown behaviour.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,

    /// Virtual host name. Sent upstream as `Host` when the client sent none.
    pub server_name: String,

    /// Optional TLS configuration. When present the gate speaks HTTPS.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
            server_name: "localhost".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Upstream (backend) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Backend authority, `host:port` (e.g., "backend:8000").
    pub address: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Time allowed for the backend to produce response headers, in seconds.
    pub response_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
            connect_timeout_secs: 60,
            response_timeout_secs: 60,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes. Equal is accepted.
    pub max_body_size: usize,

    /// Status of the oversize answer.
    pub oversize_status: u16,

    /// Literal JSON body of the oversize answer.
    pub oversize_body: String,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            oversize_status: 400,
            oversize_body: OVERSIZE_BODY.to_string(),
        }
    }
}

/// How upstream failures are translated for the client.
///
/// The variants are alternative deployments of the same gate; their trigger
/// sets are never merged.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Fixed JSON body with one status for every trigger.
    Json(JsonFallback),
    /// Static HTML page read from local disk.
    StaticHtml(StaticHtmlFallback),
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        FallbackPolicy::Json(JsonFallback::default())
    }
}

impl FallbackPolicy {
    /// Trigger statuses of the active variant.
    pub fn statuses(&self) -> &[u16] {
        match self {
            FallbackPolicy::Json(json) => &json.statuses,
            FallbackPolicy::StaticHtml(html) => &html.statuses,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JsonFallback {
    /// Upstream statuses that are replaced.
    pub statuses: Vec<u16>,

    /// Status sent instead.
    pub status: u16,

    /// Literal JSON body sent instead.
    pub body: String,
}

impl Default for JsonFallback {
    fn default() -> Self {
        Self {
            statuses: vec![502, 504],
            status: 503,
            body: BUSY_BODY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticHtmlFallback {
    /// Upstream statuses that are replaced.
    pub statuses: Vec<u16>,

    /// Directory holding the page.
    pub root: PathBuf,

    /// Page file name, relative to `root`.
    pub page: String,

    /// Status override. `None` keeps the trigger status.
    pub status: Option<u16>,
}

impl Default for StaticHtmlFallback {
    fn default() -> Self {
        Self {
            statuses: vec![500, 502, 503, 504],
            root: PathBuf::from("/usr/share/nginx/html"),
            page: "50x.html".to_string(),
            status: None,
        }
    }
}

impl StaticHtmlFallback {
    /// Full path of the fallback page.
    pub fn page_path(&self) -> PathBuf {
        self.root.join(&self.page)
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Access log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Emit one access event per request.
    pub enabled: bool,

    /// Leave WebSocket traffic out of the access log.
    pub skip_websocket: bool,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            skip_websocket: true,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Seconds granted to open tunnels after the listener stops.
    pub drain_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { drain_secs: 30 }
    }
}
