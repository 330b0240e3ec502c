//! Per-request access log.
//!
//! One `info` event per exchange on target `edge_gate::access`. With the
//! JSON log format every field becomes a top-level key of the line.
//! `request_time` is when the request arrived; the formatter's own
//! `timestamp` is when the answer went out.

use std::net::IpAddr;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::AccessLogConfig;
use crate::http::websocket::is_websocket_path;

/// How the gate answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Upstream response relayed unchanged.
    Relayed,
    /// Upstream error status replaced by a fallback answer.
    Fallback,
    /// Upstream never answered; fallback or bare gateway status sent.
    Unavailable,
    /// Body over the limit; upstream not contacted.
    Oversize,
    /// Body could not be read; upstream not contacted.
    BadRequest,
    /// Upgraded to a byte relay.
    Upgraded,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Relayed => "relayed",
            Outcome::Fallback => "fallback",
            Outcome::Unavailable => "unavailable",
            Outcome::Oversize => "oversize",
            Outcome::BadRequest => "bad_request",
            Outcome::Upgraded => "upgraded",
        }
    }
}

/// Everything one access line carries.
#[derive(Debug)]
pub struct AccessRecord<'a> {
    pub request_id: &'a str,
    pub client_ip: IpAddr,
    pub user_agent: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub status: u16,
    pub outcome: Outcome,
    pub error: Option<&'static str>,
    pub received_at: DateTime<Utc>,
    pub started: Instant,
}

/// Whether a record is written under the given settings.
pub fn should_log(config: &AccessLogConfig, path: &str, outcome: Outcome) -> bool {
    if !config.enabled {
        return false;
    }
    !(config.skip_websocket && (outcome == Outcome::Upgraded || is_websocket_path(path)))
}

pub fn emit(config: &AccessLogConfig, record: &AccessRecord<'_>) {
    if !should_log(config, record.path, record.outcome) {
        return;
    }
    tracing::info!(
        target: "edge_gate::access",
        request_time = %record.received_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        request_id = %record.request_id,
        client_ip = %record.client_ip,
        user_agent = %record.user_agent,
        method = %record.method,
        path = %record.path,
        status = record.status,
        duration = record.started.elapsed().as_secs_f64(),
        outcome = record.outcome.as_str(),
        error = record.error.unwrap_or(""),
        "access"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn line_carries_receive_time() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_writer(move || writer.clone())
            .finish();

        let received_at = DateTime::parse_from_rfc3339("2026-03-01T08:30:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        tracing::subscriber::with_default(subscriber, || {
            emit(
                &AccessLogConfig::default(),
                &AccessRecord {
                    request_id: "req-1",
                    client_ip: "10.1.2.3".parse().unwrap(),
                    user_agent: "curl/8",
                    method: "POST",
                    path: "/api/orders",
                    status: 503,
                    outcome: Outcome::Fallback,
                    error: Some("upstream_status"),
                    received_at,
                    started: Instant::now(),
                },
            );
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let line: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(line["request_time"], "2026-03-01T08:30:00.250000Z");
        assert_eq!(line["request_id"], "req-1");
        assert_eq!(line["status"], 503);
        assert_eq!(line["outcome"], "fallback");
        assert_eq!(line["error"], "upstream_status");
    }

    #[test]
    fn websocket_traffic_is_skipped_by_default() {
        let config = AccessLogConfig::default();
        assert!(should_log(&config, "/api/items", Outcome::Relayed));
        assert!(!should_log(&config, "/ws/notifications", Outcome::Relayed));
        assert!(!should_log(&config, "/live", Outcome::Upgraded));
    }

    #[test]
    fn websocket_traffic_can_be_kept() {
        let config = AccessLogConfig {
            enabled: true,
            skip_websocket: false,
        };
        assert!(should_log(&config, "/ws", Outcome::Upgraded));
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let config = AccessLogConfig {
            enabled: false,
            skip_websocket: false,
        };
        assert!(!should_log(&config, "/", Outcome::Oversize));
    }
}
