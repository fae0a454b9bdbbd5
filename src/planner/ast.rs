//! Predicate tree
//!
//! Predicates are immutable once constructed. Comparisons are type-checked
//! against their field when they are created, so a predicate that exists is
//! always well-typed.

use std::fmt;

use crate::schema::{FieldRef, SchemaError, SchemaResult, Value, ValueType};

use super::expr::Expr;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// field = value
    Eq,
    /// field < value
    Lt,
    /// field > value
    Gt,
    /// field like pattern (`%` any run, `_` any single character)
    Like,
    /// field in (values...)
    In,
}

impl CompareOp {
    /// Returns the operator as rendered in query text
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Like => "like",
            CompareOp::In => "in",
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    List(Vec<Value>),
    Expr(Expr),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{}", v.to_literal()),
            Operand::List(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.to_literal())?;
                }
                write!(f, ")")
            }
            Operand::Expr(e) => write!(f, "{}", e),
        }
    }
}

/// Boolean filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    Always,
    Comparison {
        field: FieldRef,
        op: CompareOp,
        operand: Operand,
    },
    IsNull(FieldRef),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Builds a type-checked comparison
    pub fn comparison(field: &FieldRef, op: CompareOp, operand: Operand) -> SchemaResult<Self> {
        match (&operand, op) {
            (Operand::Value(v), CompareOp::Eq | CompareOp::Lt | CompareOp::Gt | CompareOp::Like) => {
                check_literal(field, v)?;
                if op == CompareOp::Like && field.value_type() != ValueType::String {
                    return Err(SchemaError::invalid_operand(field, "like requires a string field"));
                }
            }
            (Operand::List(values), CompareOp::In) => {
                if values.is_empty() {
                    return Err(SchemaError::invalid_operand(field, "in list must not be empty"));
                }
                for v in values {
                    check_literal(field, v)?;
                }
            }
            (Operand::Expr(e), CompareOp::Eq | CompareOp::Lt | CompareOp::Gt) => {
                e.check()?;
                match e.value_type() {
                    Some(t) if t == field.value_type() => {}
                    Some(t) => return Err(SchemaError::mismatch(field, t.type_name())),
                    None => return Err(SchemaError::invalid_operand(field, "null expression")),
                }
            }
            (operand, op) => {
                return Err(SchemaError::invalid_operand(
                    field,
                    format!("operator '{}' does not accept operand {}", op.symbol(), operand),
                ))
            }
        }

        Ok(Predicate::Comparison {
            field: field.clone(),
            op,
            operand,
        })
    }

    /// AND composition; `Always` is the identity
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Always, p) | (p, Predicate::Always) => p,
            (l, r) => Predicate::And(Box::new(l), Box::new(r)),
        }
    }

    /// OR composition; `Always` absorbs
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Always, _) | (_, Predicate::Always) => Predicate::Always,
            (l, r) => Predicate::Or(Box::new(l), Box::new(r)),
        }
    }

    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    /// Flattens nested ANDs into their leaf conditions, left to right
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::And(l, r) => {
                let mut out = l.conjuncts();
                out.extend(r.conjuncts());
                out
            }
            other => vec![other],
        }
    }

    /// Fields referenced by this predicate, including operand expressions
    /// but not sub-queries
    pub fn fields(&self) -> Vec<&FieldRef> {
        let mut out = Vec::new();
        self.walk(&mut |p| match p {
            Predicate::Comparison { field, operand, .. } => {
                out.push(field);
                if let Operand::Expr(e) = operand {
                    out.extend(e.fields());
                }
            }
            Predicate::IsNull(field) => out.push(field),
            _ => {}
        });
        out
    }

    /// Operand expressions used by comparisons
    pub fn operand_exprs(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.walk(&mut |p| {
            if let Predicate::Comparison {
                operand: Operand::Expr(e),
                ..
            } = p
            {
                out.push(e);
            }
        });
        out
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Predicate)) {
        visit(self);
        match self {
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                l.walk(visit);
                r.walk(visit);
            }
            Predicate::Not(inner) => inner.walk(visit),
            _ => {}
        }
    }
}

fn check_literal(field: &FieldRef, value: &Value) -> SchemaResult<()> {
    match value.value_type() {
        None => Err(SchemaError::invalid_operand(
            field,
            "null literal, use is_null for null matching",
        )),
        Some(t) if t != field.value_type() => Err(SchemaError::mismatch(field, t.type_name())),
        Some(_) => Ok(()),
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Always => write!(f, "true"),
            Predicate::Comparison { field, op, operand } => {
                write!(f, "{} {} {}", field, op.symbol(), operand)
            }
            Predicate::IsNull(field) => write!(f, "{} is null", field),
            Predicate::And(l, r) => {
                write_child(f, l, true)?;
                write!(f, " and ")?;
                write_child(f, r, true)
            }
            Predicate::Or(l, r) => {
                write_child(f, l, false)?;
                write!(f, " or ")?;
                write_child(f, r, false)
            }
            Predicate::Not(inner) => write!(f, "not ({})", inner),
        }
    }
}

/// Parenthesizes an OR nested under an AND (and vice versa)
fn write_child(f: &mut fmt::Formatter<'_>, child: &Predicate, parent_is_and: bool) -> fmt::Result {
    let needs_parens = match child {
        Predicate::Or(..) => parent_is_and,
        Predicate::And(..) => !parent_is_and,
        _ => false,
    };
    if needs_parens {
        write!(f, "({})", child)
    } else {
        write!(f, "{}", child)
    }
}

/// Comparison shortcuts on field handles
impl FieldRef {
    pub fn eq(&self, value: impl Into<Value>) -> SchemaResult<Predicate> {
        Predicate::comparison(self, CompareOp::Eq, Operand::Value(value.into()))
    }

    pub fn lt(&self, value: impl Into<Value>) -> SchemaResult<Predicate> {
        Predicate::comparison(self, CompareOp::Lt, Operand::Value(value.into()))
    }

    pub fn gt(&self, value: impl Into<Value>) -> SchemaResult<Predicate> {
        Predicate::comparison(self, CompareOp::Gt, Operand::Value(value.into()))
    }

    pub fn like(&self, pattern: impl Into<Value>) -> SchemaResult<Predicate> {
        Predicate::comparison(self, CompareOp::Like, Operand::Value(pattern.into()))
    }

    pub fn in_list<V: Into<Value>>(
        &self,
        values: impl IntoIterator<Item = V>,
    ) -> SchemaResult<Predicate> {
        let values = values.into_iter().map(Into::into).collect();
        Predicate::comparison(self, CompareOp::In, Operand::List(values))
    }

    /// Compares against an expression such as `lower(field)` or a sub-query
    pub fn eq_expr(&self, expr: impl Into<Expr>) -> SchemaResult<Predicate> {
        Predicate::comparison(self, CompareOp::Eq, Operand::Expr(expr.into()))
    }

    pub fn lt_expr(&self, expr: impl Into<Expr>) -> SchemaResult<Predicate> {
        Predicate::comparison(self, CompareOp::Lt, Operand::Expr(expr.into()))
    }

    pub fn gt_expr(&self, expr: impl Into<Expr>) -> SchemaResult<Predicate> {
        Predicate::comparison(self, CompareOp::Gt, Operand::Expr(expr.into()))
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull(self.clone())
    }

    pub fn is_not_null(&self) -> Predicate {
        self.is_null().negate()
    }
}
