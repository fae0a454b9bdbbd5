//! Immutable query plans
//!
//! A plan is built once through `QueryFactory` and can be executed any number
//! of times, from any thread. It holds no session or connection state.

use std::fmt::Write as _;

use crate::projection::ProjectionSpec;
use crate::schema::{FieldRef, Relation};

use super::ast::Predicate;
use super::expr::Expr;

/// What a plan does when executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    Read,
    Update,
    Delete,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::Read => "READ",
            PlanKind::Update => "UPDATE",
            PlanKind::Delete => "DELETE",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Ordering key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub expr: Expr,
    pub direction: SortDirection,
}

impl OrderSpec {
    pub fn asc(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// `set field = expr` in a bulk update
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: FieldRef,
    pub value: Expr,
}

/// Immutable query plan
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub(super) source: String,
    pub(super) kind: PlanKind,
    pub(super) selection: ProjectionSpec,
    pub(super) joins: Vec<Relation>,
    pub(super) filter: Option<Predicate>,
    pub(super) group_by: Vec<Expr>,
    pub(super) order_by: Vec<OrderSpec>,
    pub(super) limit: Option<u64>,
    pub(super) offset: u64,
    pub(super) assignments: Vec<Assignment>,
}

impl QueryPlan {
    /// Source entity
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    /// Selected columns and projection strategy (empty for writes)
    pub fn selection(&self) -> &ProjectionSpec {
        &self.selection
    }

    /// Inner joins in declaration order
    pub fn joins(&self) -> &[Relation] {
        &self.joins
    }

    /// Filter, `None` meaning every row
    pub fn filter(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    pub fn group_by(&self) -> &[Expr] {
        &self.group_by
    }

    pub fn order_by(&self) -> &[OrderSpec] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Assignments of an update plan
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// True if rows are collapsed into groups before projection
    pub fn is_aggregated(&self) -> bool {
        !self.group_by.is_empty()
            || self
                .selection
                .columns()
                .iter()
                .any(|c| c.expr().contains_aggregate())
    }

    /// Plan with a different row limit, used for first-row fetches
    pub(crate) fn with_limit(&self, limit: u64) -> QueryPlan {
        let mut plan = self.clone();
        plan.limit = Some(limit);
        plan
    }

    /// Renders the plan as query text
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        match self.kind {
            PlanKind::Read => {
                out.push_str("select ");
                let columns: Vec<String> = self
                    .selection
                    .columns()
                    .iter()
                    .map(|c| match c.expr() {
                        Expr::Field(f) if f.name() == c.label() => c.expr().to_string(),
                        expr => format!("{} as {}", expr, c.label()),
                    })
                    .collect();
                out.push_str(&columns.join(", "));
                let _ = write!(out, " from {}", self.source);
                for join in &self.joins {
                    let _ = write!(out, " inner join {}", join);
                }
            }
            PlanKind::Update => {
                let _ = write!(out, "update {} set ", self.source);
                let sets: Vec<String> = self
                    .assignments
                    .iter()
                    .map(|a| format!("{} = {}", a.field, a.value))
                    .collect();
                out.push_str(&sets.join(", "));
            }
            PlanKind::Delete => {
                let _ = write!(out, "delete from {}", self.source);
            }
        }

        if let Some(filter) = &self.filter {
            let _ = write!(out, " where {}", filter);
        }
        if !self.group_by.is_empty() {
            let keys: Vec<String> = self.group_by.iter().map(|e| e.to_string()).collect();
            let _ = write!(out, " group by {}", keys.join(", "));
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.expr, o.direction.as_str()))
                .collect();
            let _ = write!(out, " order by {}", keys.join(", "));
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, " limit {}", limit);
        }
        if self.offset > 0 {
            let _ = write!(out, " offset {}", self.offset);
        }
        out
    }
}
