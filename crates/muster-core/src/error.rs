//! Core error types

use muster_config::{ConfigError, ValidationError};
use muster_util::IdError;
use thiserror::Error;

/// Errors from the registry and batch driver
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    #[error("Policy already registered: {0}")]
    DuplicatePolicy(String),

    #[error("Invalid policy definition: {errors:?}")]
    InvalidPolicy { errors: Vec<ValidationError> },

    #[error(transparent)]
    Config(ConfigError),

    #[error("Evaluation worker panicked")]
    WorkerPanicked,
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed { errors } => CoreError::InvalidPolicy { errors },
            other => CoreError::Config(other),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Why one member of a batch could not be evaluated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberError {
    #[error(transparent)]
    InvalidId(#[from] IdError),

    #[error("member '{0}' appears more than once in the roster")]
    DuplicateMember(String),
}
