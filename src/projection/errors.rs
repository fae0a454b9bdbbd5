//! Projection error types
//!
//! Error codes:
//! - AERO_PROJECTION_UNMATCHED_COLUMN
//! - AERO_PROJECTION_ARITY
//! - AERO_PROJECTION_TYPE
//! - AERO_PROJECTION_MISSING_COLUMN
//! - AERO_PROJECTION_DESERIALIZE

use thiserror::Error;

use crate::schema::{FromValue, Value};

/// Result type for projection operations
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// A result shape that cannot be mapped onto its target
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Row column has no corresponding property or field on the target
    #[error("Column '{column}' has no matching property on {target}")]
    UnmatchedColumn { target: String, column: String },

    /// Wrong number of values for the target
    #[error("{target} expects {expected} values but got {actual}")]
    ArityMismatch {
        target: String,
        expected: usize,
        actual: usize,
    },

    /// Value type does not fit the target slot
    #[error("{target}.{name} expects {expected} but got {actual}")]
    TypeMismatch {
        target: String,
        name: String,
        expected: String,
        actual: String,
    },

    /// Requested column is not part of the selection
    #[error("Column '{0}' is not part of the selection")]
    MissingColumn(String),

    /// Field-style target rejected the row
    #[error("Failed to build {target}: {reason}")]
    Deserialize { target: String, reason: String },
}

impl ProjectionError {
    pub fn unmatched(target: impl Into<String>, column: impl Into<String>) -> Self {
        ProjectionError::UnmatchedColumn {
            target: target.into(),
            column: column.into(),
        }
    }

    pub fn arity(target: impl Into<String>, expected: usize, actual: usize) -> Self {
        ProjectionError::ArityMismatch {
            target: target.into(),
            expected,
            actual,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ProjectionError::UnmatchedColumn { .. } => "AERO_PROJECTION_UNMATCHED_COLUMN",
            ProjectionError::ArityMismatch { .. } => "AERO_PROJECTION_ARITY",
            ProjectionError::TypeMismatch { .. } => "AERO_PROJECTION_TYPE",
            ProjectionError::MissingColumn(_) => "AERO_PROJECTION_MISSING_COLUMN",
            ProjectionError::Deserialize { .. } => "AERO_PROJECTION_DESERIALIZE",
        }
    }
}

/// Converts a value into the type expected by `target.name`
pub fn convert<V: FromValue>(target: &str, name: &str, value: Value) -> ProjectionResult<V> {
    let actual = value.type_name();
    V::from_value(value).ok_or_else(|| ProjectionError::TypeMismatch {
        target: target.to_string(),
        name: name.to_string(),
        expected: V::expected().to_string(),
        actual: actual.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert() {
        let name: String = convert("MemberDto", "username", Value::from("member1")).unwrap();
        assert_eq!(name, "member1");

        let err = convert::<i64>("MemberDto", "age", Value::from("ten")).unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_TYPE");
        assert_eq!(err.to_string(), "MemberDto.age expects int but got string");
    }

    #[test]
    fn test_arity_display() {
        let err = ProjectionError::arity("MemberDto", 2, 3);
        assert_eq!(err.to_string(), "MemberDto expects 2 values but got 3");
    }
}
