//! HTTP/1.1 client for the single upstream.
//!
//! # Responsibilities
//! - Hold the pooled client and the fixed upstream authority
//! - Bound connection setup and time-to-response-headers
//! - Classify failures into the trigger status used by the fallback table
//!
//! # Design Decisions
//! - No retries; one attempt per request
//! - Connect failures map to 502, missing response headers in time to 504

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{uri::Authority, Request, Response, StatusCode},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;

/// Why the upstream produced no response.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream connect failed: {0}")]
    Connect(String),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Request(String),
}

impl UpstreamError {
    /// Status an equivalent nginx hop would have produced.
    pub fn trigger_status(&self) -> StatusCode {
        match self {
            UpstreamError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            UpstreamError::Connect(_) | UpstreamError::Request(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short failure class for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Connect(_) => "connect",
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Request(_) => "request",
        }
    }
}

/// The fixed upstream and a client to reach it.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    response_timeout: Duration,
}

impl Upstream {
    /// Build from validated configuration.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, axum::http::uri::InvalidUri> {
        let authority = Authority::from_str(&config.address)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            authority,
            response_timeout: Duration::from_secs(config.response_timeout_secs),
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Send one request and wait for the response head.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, UpstreamError> {
        match tokio::time::timeout(self.response_timeout, self.client.request(request)).await {
            Err(_) => Err(UpstreamError::Timeout(self.response_timeout)),
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_connect() => Err(UpstreamError::Connect(e.to_string())),
            Ok(Err(e)) => Err(UpstreamError::Request(e.to_string())),
        }
    }
}
