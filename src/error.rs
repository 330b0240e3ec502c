//! Crate-level error type for startup and serving.
//!
//! Per-request failures never surface here: they are translated into
//! client responses by the handler.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid upstream address: {0}")]
    UpstreamAddress(#[from] axum::http::uri::InvalidUri),

    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("logging setup failed: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("metrics setup failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
