//! Data source seam
//!
//! The executor never touches storage directly. A `DataSource` evaluates a
//! validated plan and hands back positional rows aligned with the plan's
//! selected columns.

use thiserror::Error;

use crate::planner::QueryPlan;
use crate::schema::{SchemaCatalog, Value};

/// Result type for data source operations
pub type DataSourceResult<T> = Result<T, DataSourceError>;

/// Failure reported by a data source. Surfaced verbatim, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataSourceError {
    /// Source is unreachable
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Write rejected by a constraint
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// Expression could not be evaluated against a row
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// Plan shape the source cannot run
    #[error("Unsupported plan: {0}")]
    Unsupported(String),
}

impl DataSourceError {
    pub fn code(&self) -> &'static str {
        match self {
            DataSourceError::Connection(_) => "AERO_SOURCE_CONNECTION",
            DataSourceError::Constraint(_) => "AERO_SOURCE_CONSTRAINT",
            DataSourceError::Evaluation(_) => "AERO_SOURCE_EVALUATION",
            DataSourceError::Unsupported(_) => "AERO_SOURCE_UNSUPPORTED",
        }
    }
}

/// One result row, positionally aligned with the selected columns
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    values: Vec<Value>,
}

impl ResultRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for ResultRow {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Evaluates plans. Implementations must be safe to share between threads.
pub trait DataSource: Send + Sync {
    /// Catalog the source's tables conform to
    fn schema(&self) -> &SchemaCatalog;

    /// Runs a read plan
    fn fetch(&self, plan: &QueryPlan) -> DataSourceResult<Vec<ResultRow>>;

    /// Runs an update or delete plan, returning the affected row count
    fn mutate(&self, plan: &QueryPlan) -> DataSourceResult<u64>;
}
