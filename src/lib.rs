//! Edge gate: a single-upstream reverse proxy that enforces a request body
//! limit and replaces upstream failures with fixed, client-safe answers.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::GateConfig;
pub use error::GateError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
