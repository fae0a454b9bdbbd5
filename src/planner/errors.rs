//! Planner error types
//!
//! Error codes:
//! - AERO_QUERY_SCHEMA (REJECT, wraps a schema error)
//! - AERO_QUERY_PROJECTION (REJECT, wraps a projection error)
//! - AERO_QUERY_FIELD_NOT_IN_SCOPE (REJECT)
//! - AERO_QUERY_NOT_GROUPED (REJECT)
//! - AERO_QUERY_INVALID_SUBQUERY (REJECT)
//! - AERO_QUERY_INVALID_JOIN (REJECT)
//! - AERO_QUERY_EMPTY_UPDATE (REJECT)
//! - AERO_QUERY_INVALID (REJECT)

use thiserror::Error;

use crate::projection::ProjectionError;
use crate::schema::SchemaError;

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Plan construction failures. A rejected plan never reaches a data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// Field belongs to neither the source nor a joined entity
    #[error("Field '{field}' is not in scope of a query over '{source_entity}'")]
    FieldNotInScope { field: String, source_entity: String },

    /// Selected column is neither aggregated nor a grouping key
    #[error("Column '{0}' must be aggregated or appear in group by")]
    NotGrouped(String),

    #[error("Invalid sub-query: {0}")]
    InvalidSubquery(String),

    #[error("Invalid join '{relation}': {reason}")]
    InvalidJoin { relation: String, reason: String },

    /// Update without assignments
    #[error("Update of '{0}' has no assignments")]
    EmptyUpdate(String),

    /// Structurally invalid plan
    #[error("Invalid query: {0}")]
    InvalidPlan(String),
}

impl PlannerError {
    pub fn not_in_scope(field: impl Into<String>, source_entity: impl Into<String>) -> Self {
        PlannerError::FieldNotInScope {
            field: field.into(),
            source_entity: source_entity.into(),
        }
    }

    pub fn invalid_join(relation: impl Into<String>, reason: impl Into<String>) -> Self {
        PlannerError::InvalidJoin {
            relation: relation.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::Schema(_) => "AERO_QUERY_SCHEMA",
            PlannerError::Projection(_) => "AERO_QUERY_PROJECTION",
            PlannerError::FieldNotInScope { .. } => "AERO_QUERY_FIELD_NOT_IN_SCOPE",
            PlannerError::NotGrouped(_) => "AERO_QUERY_NOT_GROUPED",
            PlannerError::InvalidSubquery(_) => "AERO_QUERY_INVALID_SUBQUERY",
            PlannerError::InvalidJoin { .. } => "AERO_QUERY_INVALID_JOIN",
            PlannerError::EmptyUpdate(_) => "AERO_QUERY_EMPTY_UPDATE",
            PlannerError::InvalidPlan(_) => "AERO_QUERY_INVALID",
        }
    }

    /// Code of the underlying failure, looking through wrapped errors
    pub fn root_code(&self) -> &'static str {
        match self {
            PlannerError::Schema(e) => e.code(),
            PlannerError::Projection(e) => e.code(),
            other => other.code(),
        }
    }
}
