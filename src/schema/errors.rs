//! Schema error types
//!
//! Error codes:
//! - AERO_SCHEMA_MISMATCH (REJECT)
//! - AERO_UNKNOWN_ENTITY (REJECT)
//! - AERO_UNKNOWN_FIELD (REJECT)
//! - AERO_UNKNOWN_RELATION (REJECT)
//! - AERO_INVALID_OPERAND (REJECT)
//! - AERO_SCHEMA_MALFORMED (FATAL)

use thiserror::Error;

use super::field::FieldRef;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while defining a catalog or type-checking a query against it.
///
/// All of these are construction-time errors: a query that trips one of them
/// never reaches a data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Literal or expression type does not match the field's value type
    #[error("Field '{field}' expects {expected} but got {actual}")]
    SchemaMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Entity is not registered in the catalog
    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    /// Field is not declared on the entity
    #[error("Unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    /// Relation is not declared on the entity
    #[error("Unknown relation '{relation}' on entity '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    /// Operand shape is not valid for the operator
    #[error("Invalid operand for '{field}': {reason}")]
    InvalidOperand { field: String, reason: String },

    /// Catalog definition could not be read or is inconsistent
    #[error("Malformed schema '{origin}': {reason}")]
    Malformed { origin: String, reason: String },
}

impl SchemaError {
    /// Create a type mismatch error for the given field
    pub fn mismatch(field: &FieldRef, actual: impl Into<String>) -> Self {
        SchemaError::SchemaMismatch {
            field: field.qualified_name(),
            expected: field.value_type().type_name().to_string(),
            actual: actual.into(),
        }
    }

    /// Create an invalid operand error for the given field
    pub fn invalid_operand(field: &FieldRef, reason: impl Into<String>) -> Self {
        SchemaError::InvalidOperand {
            field: field.qualified_name(),
            reason: reason.into(),
        }
    }

    /// Create an unknown field error
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        SchemaError::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create a malformed catalog error
    pub fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::SchemaMismatch { .. } => "AERO_SCHEMA_MISMATCH",
            SchemaError::UnknownEntity(_) => "AERO_UNKNOWN_ENTITY",
            SchemaError::UnknownField { .. } => "AERO_UNKNOWN_FIELD",
            SchemaError::UnknownRelation { .. } => "AERO_UNKNOWN_RELATION",
            SchemaError::InvalidOperand { .. } => "AERO_INVALID_OPERAND",
            SchemaError::Malformed { .. } => "AERO_SCHEMA_MALFORMED",
        }
    }

    /// Returns whether the process should refuse to continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, SchemaError::Malformed { .. })
    }
}
