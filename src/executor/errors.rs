//! Executor error types
//!
//! Error codes:
//! - AERO_EXECUTION_FAILED (ERROR, wraps a data source failure)
//! - AERO_EXECUTION_PROJECTION (ERROR)
//! - AERO_EXECUTION_EMPTY_RESULT (ERROR)
//! - AERO_EXECUTION_AMBIGUOUS_RESULT (ERROR)
//! - AERO_EXECUTION_WRONG_PLAN_KIND (ERROR)
//! - AERO_EXECUTION_CANCELLED (ERROR)
//! - AERO_EXECUTION_DEADLINE (ERROR)
//! - AERO_EXECUTION_LIMIT (ERROR)

use thiserror::Error;

use crate::planner::PlanKind;
use crate::projection::ProjectionError;

use super::source::DataSourceError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    /// Data source failure, propagated verbatim
    #[error("Execution failed: {0}")]
    Execution(#[from] DataSourceError),

    /// Row could not be mapped onto the projection target
    #[error("Projection failed: {0}")]
    Projection(#[from] ProjectionError),

    /// `fetch_one` found no row
    #[error("Expected exactly one row but found none")]
    EmptyResult,

    /// `fetch_one` found several rows
    #[error("Expected exactly one row but found {count}")]
    AmbiguousResult { count: usize },

    #[error("Expected {expected} plan but got {actual}")]
    WrongPlanKind { expected: String, actual: String },

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Execution deadline exceeded")]
    DeadlineExceeded,

    /// Result set larger than the configured maximum
    #[error("Result of {rows} rows exceeds the limit of {max_rows}")]
    ExecutionLimit { rows: usize, max_rows: usize },
}

impl ExecutorError {
    pub fn wrong_kind(expected: PlanKind, actual: PlanKind) -> Self {
        ExecutorError::WrongPlanKind {
            expected: expected.as_str().to_string(),
            actual: actual.as_str().to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Execution(_) => "AERO_EXECUTION_FAILED",
            ExecutorError::Projection(_) => "AERO_EXECUTION_PROJECTION",
            ExecutorError::EmptyResult => "AERO_EXECUTION_EMPTY_RESULT",
            ExecutorError::AmbiguousResult { .. } => "AERO_EXECUTION_AMBIGUOUS_RESULT",
            ExecutorError::WrongPlanKind { .. } => "AERO_EXECUTION_WRONG_PLAN_KIND",
            ExecutorError::Cancelled => "AERO_EXECUTION_CANCELLED",
            ExecutorError::DeadlineExceeded => "AERO_EXECUTION_DEADLINE",
            ExecutorError::ExecutionLimit { .. } => "AERO_EXECUTION_LIMIT",
        }
    }

    /// Code of the underlying failure, looking through wrapped errors
    pub fn root_code(&self) -> &'static str {
        match self {
            ExecutorError::Execution(e) => e.code(),
            ExecutorError::Projection(e) => e.code(),
            other => other.code(),
        }
    }

    /// True for cancellation and deadline aborts
    pub fn is_abort(&self) -> bool {
        matches!(self, ExecutorError::Cancelled | ExecutorError::DeadlineExceeded)
    }
}
