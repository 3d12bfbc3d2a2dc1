//! Policy configuration for muster
//!
//! Supports TOML policy files with:
//! - Versioned schema
//! - Run settings (frequency filter, calendar, member id style)
//! - Policy definitions: flexible-hour thresholds, weekday windows, training days
//! - Validation with errors that name the offending field
//!
//! Single definitions can also be supplied at runtime as TOML or JSON.

mod builtin;
mod policy;
mod schema;
mod validation;

pub use builtin::*;
pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate a policy file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate a policy file from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    // Check version
    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    Config::from_raw(raw).map_err(|errors| ConfigError::ValidationFailed { errors })
}

/// Parse and validate one policy definition from TOML
pub fn parse_policy_toml(content: &str) -> ConfigResult<PolicyDefinition> {
    let raw: RawPolicy = toml::from_str(content)?;
    validated(&raw)
}

/// Parse and validate one policy definition from JSON
pub fn parse_policy_json(content: &str) -> ConfigResult<PolicyDefinition> {
    let raw: RawPolicy = serde_json::from_str(content)?;
    validated(&raw)
}

fn validated(raw: &RawPolicy) -> ConfigResult<PolicyDefinition> {
    PolicyDefinition::from_raw(raw).map_err(|errors| ConfigError::ValidationFailed { errors })
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;
