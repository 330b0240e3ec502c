//! Response handling and failure translation.
//!
//! # Responsibilities
//! - Map upstream error statuses to fixed fallback answers (lookup table)
//! - Relay every other upstream response unchanged
//! - Strip hop-by-hop headers from relayed responses
//!
//! # Design Decisions
//! - The table is built once at startup and never mutated
//! - No upstream content is inspected or merged into a fallback answer
//! - Relayed bodies are streamed, not buffered

use std::collections::HashMap;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use hyper::body::Incoming;

use crate::config::{ConfigError, FallbackPolicy};
use crate::security::headers::strip_hop_by_hop;

/// A pre-authored answer substituted for an upstream failure.
#[derive(Debug, Clone)]
pub struct FallbackResponse {
    /// `None` keeps the trigger status.
    status: Option<StatusCode>,
    content_type: HeaderValue,
    body: Bytes,
}

impl FallbackResponse {
    /// Status sent to the client for the given trigger.
    pub fn status_for(&self, trigger: StatusCode) -> StatusCode {
        self.status.unwrap_or(trigger)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Render the answer for a trigger status.
    pub fn render(&self, trigger: StatusCode) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status_for(trigger);
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, self.content_type.clone());
        response
    }
}

/// Status-keyed lookup of fallback answers.
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
    entries: HashMap<StatusCode, FallbackResponse>,
}

impl FallbackTable {
    /// Build the table for the configured variant. The HTML page is read
    /// here so that serving it never touches the disk.
    pub fn from_policy(policy: &FallbackPolicy) -> Result<Self, ConfigError> {
        let answer = match policy {
            FallbackPolicy::Json(json) => FallbackResponse {
                status: StatusCode::from_u16(json.status).ok(),
                content_type: HeaderValue::from_static("application/json"),
                body: Bytes::from(json.body.clone()),
            },
            FallbackPolicy::StaticHtml(html) => {
                let path = html.page_path();
                let page = std::fs::read(&path).map_err(|source| ConfigError::FallbackPage {
                    path: path.display().to_string(),
                    source,
                })?;
                FallbackResponse {
                    status: html.status.and_then(|s| StatusCode::from_u16(s).ok()),
                    content_type: HeaderValue::from_static("text/html"),
                    body: Bytes::from(page),
                }
            }
        };

        let entries = policy
            .statuses()
            .iter()
            .filter_map(|code| StatusCode::from_u16(*code).ok())
            .map(|status| (status, answer.clone()))
            .collect();

        Ok(Self { entries })
    }

    pub fn lookup(&self, status: StatusCode) -> Option<&FallbackResponse> {
        self.entries.get(&status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Answer for an upstream that produced no response. Without a table
    /// entry the client gets the bare trigger status.
    pub fn unavailable(&self, trigger: StatusCode) -> Response {
        match self.lookup(trigger) {
            Some(answer) => answer.render(trigger),
            None => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = trigger;
                response
            }
        }
    }
}

/// What happened to an upstream response.
pub enum Translated {
    /// Replaced by a fallback answer.
    Fallback(Response),
    /// Relayed unchanged.
    Relayed(Response),
}

/// Translate an upstream response through the table, or relay it.
pub fn translate(table: &FallbackTable, response: axum::http::Response<Incoming>) -> Translated {
    let status = response.status();
    match table.lookup(status) {
        // The upstream body is dropped unread.
        Some(answer) => Translated::Fallback(answer.render(status)),
        None => Translated::Relayed(relay(response)),
    }
}

/// Forward an upstream response as-is, minus connection-scoped headers.
pub fn relay(response: axum::http::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
