//! Configuration error types
//!
//! Error codes:
//! - AERO_CONFIG_READ (FATAL)
//! - AERO_CONFIG_PARSE (FATAL)
//! - AERO_CONFIG_INVALID (FATAL)

use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    /// A field is out of range or unknown
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "AERO_CONFIG_READ",
            ConfigError::Parse(_) => "AERO_CONFIG_PARSE",
            ConfigError::Invalid(_) => "AERO_CONFIG_INVALID",
        }
    }
}
