//! Engine error types.

use thiserror::Error;

use crate::world::WorldError;

/// Errors surfaced by spec construction, configuration and submission.
#[derive(Debug, Error)]
pub enum EffectError {
    /// A spec or shape was malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The runtime was stopped; no further effects are accepted.
    #[error("Effect engine is stopped")]
    EngineStopped,

    /// The host world refused to spawn a proxy body.
    #[error("Failed to spawn proxy body: {0}")]
    Spawn(#[from] WorldError),

    /// Reading a config file failed.
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl EffectError {
    /// Shorthand for [`EffectError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result alias for engine operations.
pub type Result<T, E = EffectError> = std::result::Result<T, E>;
