//! Configuration loading from disk, environment and command line.

use std::fs;
use std::path::Path;
use thiserror::Error;
use crate::config::schema::BalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replaces `listener.bind_address` when set.
    pub bind_address: Option<String>,
    /// Replaces the backend list when non-empty. Blank entries are dropped.
    pub backends: Vec<String>,
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<BalancerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    resolve_config(Some(path), &ConfigOverrides::default())
}

/// Build the effective configuration: defaults, then the file (if any),
/// then overrides. The result is validated.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<BalancerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => BalancerConfig::default(),
    };

    if let Some(bind) = &overrides.bind_address {
        config.listener.bind_address = bind.clone();
    }

    let backends: Vec<String> = overrides
        .backends
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect();
    if !backends.is_empty() {
        config.backends = backends;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
