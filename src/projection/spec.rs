//! Projection descriptions carried by query plans

use std::fmt;
use std::sync::Arc;

use crate::planner::Column;

/// How rows of a selection are mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    /// Raw positional tuple
    Tuple,
    /// Single column converted to a value type
    Scalar,
    /// Default-constructed target populated through setters
    Bean,
    /// Target populated by writing fields directly
    Field,
    /// Target built from positional arguments
    Constructor { checked: bool },
}

impl ProjectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionKind::Tuple => "tuple",
            ProjectionKind::Scalar => "scalar",
            ProjectionKind::Bean => "bean",
            ProjectionKind::Field => "field",
            ProjectionKind::Constructor { checked: true } => "constructor",
            ProjectionKind::Constructor { checked: false } => "constructor (unchecked)",
        }
    }
}

/// Selected columns plus the strategy used to map them
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSpec {
    kind: ProjectionKind,
    target: Option<&'static str>,
    columns: Arc<[Column]>,
}

impl ProjectionSpec {
    pub fn new(kind: ProjectionKind, target: Option<&'static str>, columns: Vec<Column>) -> Self {
        Self {
            kind,
            target,
            columns: columns.into(),
        }
    }

    /// Selection of a bulk write
    pub fn empty() -> Self {
        Self::new(ProjectionKind::Tuple, None, Vec::new())
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    /// Target type name, if mapped onto a type
    pub fn target(&self) -> Option<&'static str> {
        self.target
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns shared with the tuples produced from this selection
    pub fn shared_columns(&self) -> Arc<[Column]> {
        Arc::clone(&self.columns)
    }

    /// Name used in errors and logs
    pub fn target_name(&self) -> &'static str {
        self.target.unwrap_or_else(|| self.kind.as_str())
    }
}

impl fmt::Display for ProjectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "{} {}", self.kind.as_str(), target),
            None => write!(f, "{}", self.kind.as_str()),
        }
    }
}
