//! Entity cache error types
//!
//! Error codes:
//! - AERO_CACHE_LOOKUP (ERROR, wraps the planner, source or projection failure)
//! - AERO_CACHE_DUPLICATE_ID (ERROR)

use thiserror::Error;

use crate::executor::DataSourceError;
use crate::planner::PlannerError;
use crate::projection::ProjectionError;
use crate::schema::SchemaError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Source(#[from] DataSourceError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// Identifier matched more than one row
    #[error("{entity} id {id} matches more than one row")]
    DuplicateId { entity: String, id: String },
}

impl CacheError {
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::DuplicateId { .. } => "AERO_CACHE_DUPLICATE_ID",
            _ => "AERO_CACHE_LOOKUP",
        }
    }

    /// Code of the underlying failure
    pub fn root_code(&self) -> &'static str {
        match self {
            CacheError::Schema(e) => e.code(),
            CacheError::Planner(e) => e.root_code(),
            CacheError::Source(e) => e.code(),
            CacheError::Projection(e) => e.code(),
            CacheError::DuplicateId { .. } => self.code(),
        }
    }
}
