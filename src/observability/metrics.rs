//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_gate_requests_total` (counter): requests by outcome, status
//! - `edge_gate_request_duration_seconds` (histogram): latency by outcome
//! - `edge_gate_active_tunnels` (gauge): open upgraded connections
//!
//! Without an installed exporter every update is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "edge_gate_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("edge_gate_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn set_active_tunnels(count: u64) {
    metrics::gauge!("edge_gate_active_tunnels").set(count as f64);
}
