//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Cannot read fallback page {path}: {source}")]
    FallbackPage {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command-line / environment values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind_address: Option<String>,
    pub upstream_address: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut GateConfig) {
        if let Some(bind) = &self.bind_address {
            config.listener.bind_address = bind.clone();
        }
        if let Some(upstream) = &self.upstream_address {
            config.upstream.address = upstream.clone();
        }
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GateConfig, ConfigError> {
    resolve(content, &Overrides::default())
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load the file (or defaults when `path` is `None`), apply overrides,
/// then validate the result.
pub fn load_with_overrides(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<GateConfig, ConfigError> {
    let content = match path {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    resolve(&content, overrides)
}

fn resolve(content: &str, overrides: &Overrides) -> Result<GateConfig, ConfigError> {
    let mut config: GateConfig = toml::from_str(content)?;
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
