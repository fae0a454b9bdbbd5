//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code. Wrapped
//! library errors keep their own code in the message.

use std::fmt;
use std::io;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::executor::ExecutorError;
use crate::planner::PlannerError;
use crate::sample::SampleError;
use crate::schema::SchemaError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Sample data could not be set up
    SetupFailed,
    /// Scenario plan rejected
    PlanFailed,
    /// Scenario execution failed
    ExecutionFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "AERO_CLI_CONFIG_ERROR",
            Self::IoError => "AERO_CLI_IO_ERROR",
            Self::SetupFailed => "AERO_CLI_SETUP_FAILED",
            Self::PlanFailed => "AERO_CLI_PLAN_FAILED",
            Self::ExecutionFailed => "AERO_CLI_EXECUTION_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Wraps a library error, keeping its code
    fn wrap(code: CliErrorCode, cause: &'static str, error: impl fmt::Display) -> Self {
        Self::new(code, format!("[{}] {}", cause, error))
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::wrap(CliErrorCode::ConfigError, e.code(), e)
    }
}

impl From<SampleError> for CliError {
    fn from(e: SampleError) -> Self {
        Self::wrap(CliErrorCode::SetupFailed, e.code(), e)
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::wrap(CliErrorCode::PlanFailed, e.code(), e)
    }
}

impl From<PlannerError> for CliError {
    fn from(e: PlannerError) -> Self {
        Self::wrap(CliErrorCode::PlanFailed, e.root_code(), e)
    }
}

impl From<ExecutorError> for CliError {
    fn from(e: ExecutorError) -> Self {
        Self::wrap(CliErrorCode::ExecutionFailed, e.root_code(), e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        Self::wrap(CliErrorCode::ExecutionFailed, e.root_code(), e)
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
