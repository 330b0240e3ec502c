//! Request body limits.
//!
//! # Responsibilities
//! - Enforce maximum request body size
//! - Produce the fixed oversize answer
//!
//! # Design Decisions
//! - Declared `Content-Length` is checked before any body byte is buffered
//! - Every body is buffered up to the limit; the upstream is only contacted
//!   once the whole body is in hand
//! - Equal to the limit is accepted

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use std::time::Duration;

use crate::config::LimitsConfig;

/// Upper bound on bytes read and thrown away after a rejection.
const DISCARD_MAX: u64 = 64 * 1024 * 1024;
const DISCARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a request body was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(String),
}

/// Immutable body size gate built once from [`LimitsConfig`].
#[derive(Debug, Clone)]
pub struct BodyLimit {
    max: usize,
    status: StatusCode,
    body: Bytes,
}

impl BodyLimit {
    pub fn from_config(config: &LimitsConfig) -> Self {
        Self {
            max: config.max_body_size,
            status: StatusCode::from_u16(config.oversize_status).unwrap_or(StatusCode::BAD_REQUEST),
            body: Bytes::from(config.oversize_body.clone()),
        }
    }

    /// Maximum accepted body size in bytes.
    pub fn max(&self) -> usize {
        self.max
    }

    /// True when the client announced more bytes than allowed.
    pub fn declared_too_large(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|len| len > self.max as u64)
            .unwrap_or(false)
    }

    /// Buffer the body, failing as soon as it grows past the limit. A
    /// rejected body is drained (bounded) so the client sees the answer
    /// instead of a reset connection.
    pub async fn read(&self, headers: &HeaderMap, mut body: Body) -> Result<Bytes, BodyError> {
        if self.declared_too_large(headers) {
            discard(body).await;
            return Err(BodyError::TooLarge { limit: self.max });
        }

        let mut buf = Vec::new();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| BodyError::Read(e.to_string()))?;
            if let Ok(data) = frame.into_data() {
                if buf.len() + data.len() > self.max {
                    discard(body).await;
                    return Err(BodyError::TooLarge { limit: self.max });
                }
                buf.extend_from_slice(&data);
            }
        }
        Ok(Bytes::from(buf))
    }

    /// The fixed oversize answer. Identical on every call.
    pub fn reject(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

async fn discard(mut body: Body) {
    let drain = async {
        let mut seen: u64 = 0;
        while let Some(Ok(frame)) = body.frame().await {
            if let Some(data) = frame.data_ref() {
                seen += data.len() as u64;
            }
            if seen > DISCARD_MAX {
                break;
            }
        }
    };
    let _ = tokio::time::timeout(DISCARD_TIMEOUT, drain).await;
}
