//! Explain output
//!
//! Deterministic, human-readable description of a plan or of the reason it
//! was rejected. Also serializable for the CLI's JSON output.

use std::fmt;

use serde::Serialize;

use super::errors::PlannerError;
use super::plan::{PlanKind, QueryPlan};

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    pub kind: Option<String>,
    pub source: Option<String>,
    /// Projection strategy and target
    pub projection: Option<String>,
    /// Selected columns as `label: expression`
    pub columns: Vec<String>,
    pub joins: Vec<String>,
    /// Top-level AND conditions of the filter
    pub predicates: Vec<String>,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: u64,
    pub assignments: Vec<String>,
    /// Whole plan rendered as query text
    pub query: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful query plan
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let projection = match plan.kind() {
            PlanKind::Read => Some(plan.selection().to_string()),
            PlanKind::Update | PlanKind::Delete => None,
        };
        Self {
            accepted: true,
            kind: Some(plan.kind().as_str().to_string()),
            source: Some(plan.source().to_string()),
            projection,
            columns: plan
                .selection()
                .columns()
                .iter()
                .map(|c| format!("{}: {}", c.label(), c.expr()))
                .collect(),
            joins: plan.joins().iter().map(|r| r.to_string()).collect(),
            predicates: plan
                .filter()
                .map(|f| f.conjuncts().iter().map(|p| p.to_string()).collect())
                .unwrap_or_default(),
            group_by: plan.group_by().iter().map(|e| e.to_string()).collect(),
            order_by: plan
                .order_by()
                .iter()
                .map(|o| format!("{} {}", o.expr, o.direction.as_str()))
                .collect(),
            limit: plan.limit(),
            offset: plan.offset(),
            assignments: plan
                .assignments()
                .iter()
                .map(|a| format!("{} = {}", a.field, a.value))
                .collect(),
            query: Some(plan.to_query_string()),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            kind: None,
            source: None,
            projection: None,
            columns: Vec::new(),
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
            assignments: Vec::new(),
            query: None,
            rejection_reason: Some(err.to_string()),
            rejection_code: Some(err.root_code().to_string()),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, title: &str, items: &[String]) -> fmt::Result {
    if !items.is_empty() {
        writeln!(f, "{}:", title)?;
        for item in items {
            writeln!(f, "  - {}", item)?;
        }
    }
    Ok(())
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(kind) = &self.kind {
                writeln!(f, "Kind: {}", kind)?;
            }
            if let Some(source) = &self.source {
                writeln!(f, "Source: {}", source)?;
            }
            if let Some(projection) = &self.projection {
                writeln!(f, "Projection: {}", projection)?;
            }
            write_list(f, "Columns", &self.columns)?;
            write_list(f, "Joins", &self.joins)?;
            write_list(f, "Predicates", &self.predicates)?;
            write_list(f, "Group By", &self.group_by)?;
            write_list(f, "Order By", &self.order_by)?;
            write_list(f, "Assignments", &self.assignments)?;
            if let Some(limit) = self.limit {
                writeln!(f, "Limit: {}", limit)?;
            }
            if self.offset > 0 {
                writeln!(f, "Offset: {}", self.offset)?;
            }
            if let Some(query) = &self.query {
                writeln!(f, "Query: {}", query)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
