//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → shared via Arc to every request handler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_with_overrides, parse_config, ConfigError, Overrides};
pub use schema::{
    AccessLogConfig, FallbackPolicy, GateConfig, JsonFallback, LimitsConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, StaticHtmlFallback, TlsConfig, UpstreamConfig,
};
