//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handler produces:
//!     → access_log.rs (one structured line per request)
//!     → metrics.rs (counters, gauges, histograms)
//! All subsystems produce:
//!     → logging.rs (tracing subscriber, pretty or JSON)
//!
//! Consumers:
//!     → Log shipper reading stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod access_log;
pub mod logging;
pub mod metrics;
