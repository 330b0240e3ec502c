//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses (bind address, upstream authority)
//! - Validate value ranges (limits > 0, statuses in range)
//! - Check that the fallback page exists when the HTML variant is selected
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure apart from the page existence check:
//!   GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::StatusCode;

use crate::config::schema::{FallbackPolicy, GateConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.server_name.trim().is_empty() {
        errors.push(ValidationError::new("listener.server_name", "must not be empty"));
    }
    if let Some(tls) = &config.listener.tls {
        if !tls.cert_path.exists() {
            errors.push(ValidationError::new(
                "listener.tls.cert_path",
                format!("{} does not exist", tls.cert_path.display()),
            ));
        }
        if !tls.key_path.exists() {
            errors.push(ValidationError::new(
                "listener.tls.key_path",
                format!("{} does not exist", tls.key_path.display()),
            ));
        }
    }

    match Authority::from_str(&config.upstream.address) {
        Ok(authority) if authority.port_u16().is_some() => {}
        _ => errors.push(ValidationError::new(
            "upstream.address",
            format!("'{}' is not a host:port authority", config.upstream.address),
        )),
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.connect_timeout_secs", "must be > 0"));
    }
    if config.upstream.response_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.response_timeout_secs", "must be > 0"));
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::new("limits.max_body_size", "must be > 0"));
    }
    check_status(&mut errors, "limits.oversize_status", config.limits.oversize_status, false);
    if serde_json::from_str::<serde_json::Value>(&config.limits.oversize_body).is_err() {
        errors.push(ValidationError::new("limits.oversize_body", "must be a JSON document"));
    }

    if config.fallback.statuses().is_empty() {
        errors.push(ValidationError::new("fallback.statuses", "must not be empty"));
    }
    for status in config.fallback.statuses() {
        check_status(&mut errors, "fallback.statuses", *status, true);
    }
    match &config.fallback {
        FallbackPolicy::Json(json) => {
            check_status(&mut errors, "fallback.status", json.status, false);
            if serde_json::from_str::<serde_json::Value>(&json.body).is_err() {
                errors.push(ValidationError::new("fallback.body", "must be a JSON document"));
            }
        }
        FallbackPolicy::StaticHtml(html) => {
            if let Some(status) = html.status {
                check_status(&mut errors, "fallback.status", status, false);
            }
            let path = html.page_path();
            if !path.is_file() {
                errors.push(ValidationError::new(
                    "fallback.page",
                    format!("{} is not a readable file", path.display()),
                ));
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Triggers must be error statuses; answers only need to be valid codes.
fn check_status(errors: &mut Vec<ValidationError>, field: &str, code: u16, trigger: bool) {
    match StatusCode::from_u16(code) {
        Ok(status) if trigger && !(status.is_client_error() || status.is_server_error()) => {
            errors.push(ValidationError::new(field, format!("{} is not an error status", code)));
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::new(field, format!("{} is not an HTTP status", code))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{JsonFallback, StaticHtmlFallback};

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GateConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = GateConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.upstream.address = "backend".into();
        config.limits.max_body_size = 0;
        config.fallback = FallbackPolicy::Json(JsonFallback {
            statuses: vec![200, 502],
            ..JsonFallback::default()
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "upstream.address",
                "limits.max_body_size",
                "fallback.statuses",
            ]
        );
    }

    #[test]
    fn missing_fallback_page_is_rejected() {
        let mut config = GateConfig::default();
        config.fallback = FallbackPolicy::StaticHtml(StaticHtmlFallback {
            root: "/definitely/not/here".into(),
            ..StaticHtmlFallback::default()
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "fallback.page");
    }

    #[test]
    fn hostname_upstream_is_accepted() {
        let mut config = GateConfig::default();
        config.upstream.address = "backend:8000".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn invalid_status_code() {
        let mut config = GateConfig::default();
        config.limits.oversize_status = 1000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].to_string(), "limits.oversize_status: 1000 is not an HTTP status");
    }
}
