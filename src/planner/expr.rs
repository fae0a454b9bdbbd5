//! Expressions usable in selections, comparisons and update assignments
//!
//! Every expression has a result type known before execution, so projections
//! and comparisons can be checked when the plan is built.

use std::fmt;
use std::sync::Arc;

use crate::schema::{FieldRef, SchemaError, SchemaResult, Value, ValueType};

use super::plan::{PlanKind, QueryPlan};

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Max => "max",
            AggregateFn::Min => "min",
        }
    }
}

/// Scalar SQL functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlFunction {
    /// replace(text, from, to)
    Replace,
    Lower,
    Upper,
}

impl SqlFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlFunction::Replace => "replace",
            SqlFunction::Lower => "lower",
            SqlFunction::Upper => "upper",
        }
    }

    /// Number of arguments the function takes
    pub fn arity(&self) -> usize {
        match self {
            SqlFunction::Replace => 3,
            SqlFunction::Lower | SqlFunction::Upper => 1,
        }
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
        }
    }
}

/// Typed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(FieldRef),
    Literal(Value),
    /// Aggregate over a group; `Count` without an argument counts rows
    Aggregate {
        func: AggregateFn,
        arg: Option<Box<Expr>>,
    },
    Function {
        func: SqlFunction,
        args: Vec<Expr>,
    },
    Arithmetic {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Uncorrelated scalar sub-query selecting exactly one column
    Subquery(Arc<QueryPlan>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// `count(*)`
    pub fn count_rows() -> Self {
        Expr::Aggregate {
            func: AggregateFn::Count,
            arg: None,
        }
    }

    /// Wraps a read plan as a scalar sub-query
    pub fn subquery(plan: QueryPlan) -> Self {
        Expr::Subquery(Arc::new(plan))
    }

    fn aggregate(self, func: AggregateFn) -> Self {
        Expr::Aggregate {
            func,
            arg: Some(Box::new(self)),
        }
    }

    pub fn count(self) -> Self {
        self.aggregate(AggregateFn::Count)
    }

    pub fn sum(self) -> Self {
        self.aggregate(AggregateFn::Sum)
    }

    pub fn avg(self) -> Self {
        self.aggregate(AggregateFn::Avg)
    }

    pub fn max(self) -> Self {
        self.aggregate(AggregateFn::Max)
    }

    pub fn min(self) -> Self {
        self.aggregate(AggregateFn::Min)
    }

    pub fn lower(self) -> Self {
        Expr::Function {
            func: SqlFunction::Lower,
            args: vec![self],
        }
    }

    pub fn upper(self) -> Self {
        Expr::Function {
            func: SqlFunction::Upper,
            args: vec![self],
        }
    }

    pub fn replace(self, from: impl Into<Expr>, to: impl Into<Expr>) -> Self {
        Expr::Function {
            func: SqlFunction::Replace,
            args: vec![self, from.into(), to.into()],
        }
    }

    fn arithmetic(self, op: ArithOp, rhs: impl Into<Expr>) -> Self {
        Expr::Arithmetic {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn add(self, rhs: impl Into<Expr>) -> Self {
        self.arithmetic(ArithOp::Add, rhs)
    }

    pub fn sub(self, rhs: impl Into<Expr>) -> Self {
        self.arithmetic(ArithOp::Sub, rhs)
    }

    pub fn mul(self, rhs: impl Into<Expr>) -> Self {
        self.arithmetic(ArithOp::Mul, rhs)
    }

    /// Names the expression for bean and field projections
    pub fn as_column(self, label: impl Into<String>) -> Column {
        Column::new(label, self)
    }

    /// Column labelled with the default label
    pub fn column(self) -> Column {
        Column::from(self)
    }

    /// Result type, `None` for a null literal.
    ///
    /// Assumes `check` passed.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Expr::Field(f) => Some(f.value_type()),
            Expr::Literal(v) => v.value_type(),
            Expr::Aggregate { func, arg } => match func {
                AggregateFn::Count => Some(ValueType::Int),
                AggregateFn::Avg => Some(ValueType::Decimal),
                AggregateFn::Sum | AggregateFn::Max | AggregateFn::Min => {
                    arg.as_ref().and_then(|a| a.value_type())
                }
            },
            Expr::Function { .. } => Some(ValueType::String),
            Expr::Arithmetic { lhs, rhs, .. } => {
                match (lhs.value_type(), rhs.value_type()) {
                    (Some(ValueType::Int), Some(ValueType::Int)) => Some(ValueType::Int),
                    _ => Some(ValueType::Decimal),
                }
            }
            Expr::Subquery(plan) => plan
                .selection()
                .columns()
                .first()
                .and_then(|c| c.expr().value_type()),
        }
    }

    /// True if this node is an aggregate
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggregate { .. })
    }

    /// True if an aggregate appears anywhere outside sub-queries
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate { .. } => true,
            Expr::Function { args, .. } => args.iter().any(Expr::contains_aggregate),
            Expr::Arithmetic { lhs, rhs, .. } => lhs.contains_aggregate() || rhs.contains_aggregate(),
            Expr::Field(_) | Expr::Literal(_) | Expr::Subquery(_) => false,
        }
    }

    /// Fields referenced outside aggregates and sub-queries
    pub fn bare_fields(&self) -> Vec<&FieldRef> {
        let mut out = Vec::new();
        self.walk_fields(false, &mut out);
        out
    }

    /// Every field referenced outside sub-queries
    pub fn fields(&self) -> Vec<&FieldRef> {
        let mut out = Vec::new();
        self.walk_fields(true, &mut out);
        out
    }

    /// Sub-queries referenced directly by this expression tree
    pub fn subqueries(&self) -> Vec<&QueryPlan> {
        match self {
            Expr::Subquery(plan) => vec![plan.as_ref()],
            Expr::Field(_) | Expr::Literal(_) => Vec::new(),
            Expr::Aggregate { arg, .. } => arg.iter().flat_map(|a| a.subqueries()).collect(),
            Expr::Function { args, .. } => args.iter().flat_map(Expr::subqueries).collect(),
            Expr::Arithmetic { lhs, rhs, .. } => {
                let mut out = lhs.subqueries();
                out.extend(rhs.subqueries());
                out
            }
        }
    }

    fn walk_fields<'a>(&'a self, into_aggregates: bool, out: &mut Vec<&'a FieldRef>) {
        match self {
            Expr::Field(f) => out.push(f),
            Expr::Literal(_) | Expr::Subquery(_) => {}
            Expr::Aggregate { arg, .. } => {
                if into_aggregates {
                    if let Some(arg) = arg {
                        arg.walk_fields(into_aggregates, out);
                    }
                }
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.walk_fields(into_aggregates, out);
                }
            }
            Expr::Arithmetic { lhs, rhs, .. } => {
                lhs.walk_fields(into_aggregates, out);
                rhs.walk_fields(into_aggregates, out);
            }
        }
    }

    /// Type-checks the expression tree
    pub fn check(&self) -> SchemaResult<()> {
        match self {
            Expr::Field(_) | Expr::Literal(_) => Ok(()),
            Expr::Aggregate { func, arg } => {
                let Some(arg) = arg else {
                    return match func {
                        AggregateFn::Count => Ok(()),
                        _ => Err(self.invalid("aggregate requires an argument")),
                    };
                };
                arg.check()?;
                if arg.contains_aggregate() {
                    return Err(self.invalid("aggregates cannot be nested"));
                }
                match func {
                    AggregateFn::Sum | AggregateFn::Avg => {
                        if !arg.value_type().is_some_and(|t| t.is_numeric()) {
                            return Err(self.invalid("argument must be numeric"));
                        }
                    }
                    AggregateFn::Max | AggregateFn::Min => {
                        if arg.value_type().is_none() {
                            return Err(self.invalid("argument must be typed"));
                        }
                    }
                    AggregateFn::Count => {}
                }
                Ok(())
            }
            Expr::Function { func, args } => {
                if args.len() != func.arity() {
                    return Err(self.invalid(format!(
                        "expects {} arguments, got {}",
                        func.arity(),
                        args.len()
                    )));
                }
                for arg in args {
                    arg.check()?;
                    if arg.value_type() != Some(ValueType::String) {
                        return Err(self.invalid("arguments must be strings"));
                    }
                }
                Ok(())
            }
            Expr::Arithmetic { lhs, rhs, .. } => {
                lhs.check()?;
                rhs.check()?;
                let numeric = |e: &Expr| e.value_type().is_some_and(|t| t.is_numeric());
                if !numeric(lhs) || !numeric(rhs) {
                    return Err(self.invalid("operands must be numeric"));
                }
                Ok(())
            }
            Expr::Subquery(plan) => {
                if plan.kind() != PlanKind::Read {
                    return Err(self.invalid("sub-query must be a read"));
                }
                if plan.selection().columns().len() != 1 {
                    return Err(self.invalid("sub-query must select exactly one column"));
                }
                Ok(())
            }
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidOperand {
            field: self.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field(field) => write!(f, "{}", field),
            Expr::Literal(value) => write!(f, "{}", value.to_literal()),
            Expr::Aggregate { func, arg } => match arg {
                Some(arg) => write!(f, "{}({})", func.as_str(), arg),
                None => write!(f, "{}(*)", func.as_str()),
            },
            Expr::Function { func, args } => {
                write!(f, "{}(", func.as_str())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Arithmetic { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            Expr::Subquery(plan) => write!(f, "({})", plan.to_query_string()),
        }
    }
}

impl From<FieldRef> for Expr {
    fn from(field: FieldRef) -> Self {
        Expr::Field(field)
    }
}

impl From<&FieldRef> for Expr {
    fn from(field: &FieldRef) -> Self {
        Expr::Field(field.clone())
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(Value::from(s))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Value::from(s))
    }
}

impl From<i64> for Expr {
    fn from(i: i64) -> Self {
        Expr::Literal(Value::Int(i))
    }
}

impl From<i32> for Expr {
    fn from(i: i32) -> Self {
        Expr::Literal(Value::from(i))
    }
}

impl From<f64> for Expr {
    fn from(d: f64) -> Self {
        Expr::Literal(Value::Decimal(d))
    }
}

/// Expression shortcuts on field handles
impl FieldRef {
    pub fn expr(&self) -> Expr {
        Expr::Field(self.clone())
    }

    pub fn count(&self) -> Expr {
        self.expr().count()
    }

    pub fn sum(&self) -> Expr {
        self.expr().sum()
    }

    pub fn avg(&self) -> Expr {
        self.expr().avg()
    }

    pub fn max(&self) -> Expr {
        self.expr().max()
    }

    pub fn min(&self) -> Expr {
        self.expr().min()
    }

    pub fn lower(&self) -> Expr {
        self.expr().lower()
    }

    pub fn upper(&self) -> Expr {
        self.expr().upper()
    }

    pub fn replace(&self, from: impl Into<Expr>, to: impl Into<Expr>) -> Expr {
        self.expr().replace(from, to)
    }

    pub fn add(&self, rhs: impl Into<Expr>) -> Expr {
        self.expr().add(rhs)
    }

    pub fn mul(&self, rhs: impl Into<Expr>) -> Expr {
        self.expr().mul(rhs)
    }

    pub fn as_column(&self, label: impl Into<String>) -> Column {
        Column::new(label, self.expr())
    }

    pub fn column(&self) -> Column {
        Column::from(self)
    }
}

/// One selected output column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    label: String,
    expr: Expr,
}

impl Column {
    pub fn new(label: impl Into<String>, expr: Expr) -> Self {
        Self {
            label: label.into(),
            expr,
        }
    }

    /// Name used by bean and field projections
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl From<Expr> for Column {
    fn from(expr: Expr) -> Self {
        let label = match &expr {
            Expr::Field(field) => field.name().to_string(),
            other => other.to_string(),
        };
        Column { label, expr }
    }
}

impl From<FieldRef> for Column {
    fn from(field: FieldRef) -> Self {
        Column::from(Expr::Field(field))
    }
}

impl From<&FieldRef> for Column {
    fn from(field: &FieldRef) -> Self {
        Column::from(Expr::Field(field.clone()))
    }
}
