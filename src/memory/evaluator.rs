//! Predicate and expression evaluation for in-memory plans
//!
//! Predicates use three-valued logic: a comparison involving null is
//! unknown, and only rows whose filter is definitely true are kept.
//! No type coercion beyond int/decimal numeric comparison.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::iter;
use std::sync::Arc;

use regex::Regex;

use crate::executor::{DataSourceError, DataSourceResult};
use crate::planner::{ArithOp, CompareOp, Expr, Operand, Predicate, QueryPlan, SqlFunction};
use crate::schema::{FieldRef, SchemaCatalog, Value};

use super::aggregate;
use super::source::{read, Tables};

/// What an expression is evaluated against
#[derive(Debug, Clone, Copy)]
pub(super) enum Scope<'r> {
    /// One joined row
    Row(&'r [Value]),
    /// Every joined row of one group
    Group(&'r [&'r [Value]]),
}

/// Evaluates one plan's predicates and expressions.
///
/// Lives for a single fetch or mutation. Compiled `like` patterns and scalar
/// sub-query results are cached for that lifetime, so each sub-query runs
/// once per execution.
pub(super) struct Evaluator<'t> {
    catalog: &'t SchemaCatalog,
    tables: &'t Tables,
    positions: HashMap<FieldRef, usize>,
    patterns: RefCell<HashMap<String, Regex>>,
    scalars: RefCell<HashMap<usize, Value>>,
}

impl<'t> Evaluator<'t> {
    /// Lays out joined rows as the source entity's columns followed by
    /// each joined entity's columns, in join order
    pub fn new(catalog: &'t SchemaCatalog, tables: &'t Tables, plan: &QueryPlan) -> DataSourceResult<Self> {
        let mut positions = HashMap::new();
        let mut width = 0;
        let entities = iter::once(plan.source()).chain(plan.joins().iter().map(|r| r.to_entity()));
        for name in entities {
            let entity = catalog
                .entity(name)
                .map_err(|e| DataSourceError::Unsupported(e.to_string()))?;
            for (i, field) in entity.fields().iter().enumerate() {
                positions.insert(field.clone(), width + i);
            }
            width += entity.fields().len();
        }

        Ok(Self {
            catalog,
            tables,
            positions,
            patterns: RefCell::new(HashMap::new()),
            scalars: RefCell::new(HashMap::new()),
        })
    }

    /// Position of a field within a joined row
    pub fn position(&self, field: &FieldRef) -> DataSourceResult<usize> {
        self.positions.get(field).copied().ok_or_else(|| {
            DataSourceError::Evaluation(format!("field '{}' is not in scope", field))
        })
    }

    /// True only if the predicate is definitely true for the row
    pub fn matches(&self, predicate: &Predicate, row: &[Value]) -> DataSourceResult<bool> {
        Ok(self.truth(predicate, row)? == Some(true))
    }

    /// Three-valued truth: `None` is unknown
    fn truth(&self, predicate: &Predicate, row: &[Value]) -> DataSourceResult<Option<bool>> {
        match predicate {
            Predicate::Always => Ok(Some(true)),
            Predicate::Comparison { field, op, operand } => {
                let lhs = self.field(field, row)?;
                self.compare(*op, lhs, operand, row)
            }
            Predicate::IsNull(field) => Ok(Some(self.field(field, row)?.is_null())),
            Predicate::And(l, r) => {
                let left = self.truth(l, row)?;
                if left == Some(false) {
                    return Ok(Some(false));
                }
                Ok(match (left, self.truth(r, row)?) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                })
            }
            Predicate::Or(l, r) => {
                let left = self.truth(l, row)?;
                if left == Some(true) {
                    return Ok(Some(true));
                }
                Ok(match (left, self.truth(r, row)?) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                })
            }
            Predicate::Not(inner) => Ok(self.truth(inner, row)?.map(|t| !t)),
        }
    }

    fn compare(
        &self,
        op: CompareOp,
        lhs: &Value,
        operand: &Operand,
        row: &[Value],
    ) -> DataSourceResult<Option<bool>> {
        if lhs.is_null() {
            return Ok(None);
        }
        match (op, operand) {
            (CompareOp::In, Operand::List(values)) => Ok(Some(values.iter().any(|v| lhs.sql_eq(v)))),
            (CompareOp::Like, Operand::Value(pattern)) => match (lhs.as_str(), pattern.as_str()) {
                (Some(text), Some(pattern)) => self.like(text, pattern).map(Some),
                _ => Ok(None),
            },
            (CompareOp::Eq | CompareOp::Lt | CompareOp::Gt, Operand::Value(rhs)) => {
                Ok(ordering_matches(op, lhs, rhs))
            }
            (CompareOp::Eq | CompareOp::Lt | CompareOp::Gt, Operand::Expr(expr)) => {
                let rhs = self.eval(expr, Scope::Row(row))?;
                Ok(ordering_matches(op, lhs, &rhs))
            }
            (op, operand) => Err(DataSourceError::Unsupported(format!(
                "operator '{}' with operand {}",
                op.symbol(),
                operand
            ))),
        }
    }

    fn like(&self, text: &str, pattern: &str) -> DataSourceResult<bool> {
        let mut patterns = self.patterns.borrow_mut();
        let regex = match patterns.entry(pattern.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(like_regex(pattern)?),
        };
        Ok(regex.is_match(text))
    }

    fn field<'r>(&self, field: &FieldRef, row: &'r [Value]) -> DataSourceResult<&'r Value> {
        let position = self.position(field)?;
        row.get(position).ok_or_else(|| {
            DataSourceError::Evaluation(format!("row has no column for '{}'", field))
        })
    }

    /// Evaluates an expression against a row or a group
    pub fn eval(&self, expr: &Expr, scope: Scope<'_>) -> DataSourceResult<Value> {
        match expr {
            Expr::Field(field) => match scope {
                Scope::Row(row) => self.field(field, row).cloned(),
                // Grouping keys are constant within a group
                Scope::Group(rows) => match rows.first() {
                    Some(row) => self.field(field, row).cloned(),
                    None => Ok(Value::Null),
                },
            },
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Aggregate { func, arg } => {
                let Scope::Group(rows) = scope else {
                    return Err(DataSourceError::Evaluation(format!(
                        "aggregate '{}' outside a group",
                        expr
                    )));
                };
                match arg {
                    None => Ok(Value::Int(rows.len() as i64)),
                    Some(arg) => {
                        let values = rows
                            .iter()
                            .map(|row| self.eval(arg, Scope::Row(row)))
                            .collect::<DataSourceResult<Vec<_>>>()?;
                        aggregate::compute(*func, &values)
                    }
                }
            }
            Expr::Function { func, args } => {
                let values = args
                    .iter()
                    .map(|a| self.eval(a, scope))
                    .collect::<DataSourceResult<Vec<_>>>()?;
                call(*func, &values)
            }
            Expr::Arithmetic { op, lhs, rhs } => {
                arithmetic(*op, &self.eval(lhs, scope)?, &self.eval(rhs, scope)?)
            }
            Expr::Subquery(plan) => self.scalar(plan),
        }
    }

    /// Single value of an uncorrelated sub-query; null when it selects no row
    fn scalar(&self, plan: &Arc<QueryPlan>) -> DataSourceResult<Value> {
        let key = Arc::as_ptr(plan) as usize;
        if let Some(value) = self.scalars.borrow().get(&key) {
            return Ok(value.clone());
        }

        let rows = read(self.catalog, self.tables, plan)?;
        let value = match rows.as_slice() {
            [] => Value::Null,
            [row] => row.first().cloned().unwrap_or(Value::Null),
            rows => {
                return Err(DataSourceError::Evaluation(format!(
                    "scalar sub-query returned {} rows",
                    rows.len()
                )))
            }
        };
        self.scalars.borrow_mut().insert(key, value.clone());
        Ok(value)
    }
}

fn ordering_matches(op: CompareOp, lhs: &Value, rhs: &Value) -> Option<bool> {
    let ordering = lhs.compare(rhs)?;
    let wanted = match op {
        CompareOp::Eq => Ordering::Equal,
        CompareOp::Lt => Ordering::Less,
        CompareOp::Gt => Ordering::Greater,
        CompareOp::Like | CompareOp::In => return None,
    };
    Some(ordering == wanted)
}

/// Translates a `like` pattern into an anchored regex.
///
/// `%` matches any run of characters, `_` exactly one; everything else is
/// literal.
pub(super) fn like_regex(pattern: &str) -> DataSourceResult<Regex> {
    let mut source = String::from("(?s)^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if c == '%' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');

    Regex::new(&source).map_err(|e| {
        DataSourceError::Evaluation(format!("invalid like pattern '{}': {}", pattern, e))
    })
}

fn call(func: SqlFunction, args: &[Value]) -> DataSourceResult<Value> {
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let text = |i: usize| {
        args.get(i).and_then(Value::as_str).ok_or_else(|| {
            DataSourceError::Evaluation(format!("{}() expects string arguments", func.as_str()))
        })
    };
    match func {
        SqlFunction::Lower => Ok(Value::from(text(0)?.to_lowercase())),
        SqlFunction::Upper => Ok(Value::from(text(0)?.to_uppercase())),
        SqlFunction::Replace => Ok(Value::from(text(0)?.replace(text(1)?, text(2)?))),
    }
}

fn arithmetic(op: ArithOp, lhs: &Value, rhs: &Value) -> DataSourceResult<Value> {
    match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                ArithOp::Add => a.checked_add(*b),
                ArithOp::Sub => a.checked_sub(*b),
                ArithOp::Mul => a.checked_mul(*b),
            };
            result.map(Value::Int).ok_or_else(|| {
                DataSourceError::Evaluation(format!("integer overflow in {} {} {}", a, op.symbol(), b))
            })
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Decimal(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
            })),
            _ => Err(DataSourceError::Evaluation(format!(
                "cannot apply '{}' to {} and {}",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::QueryFactory;
    use crate::schema::{EntitySchema, ValueType};

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_definitions(vec![EntitySchema::new("member", "id")
            .field("id", ValueType::Int)
            .field("username", ValueType::String)
            .field("age", ValueType::Int)])
        .unwrap()
    }

    fn with_evaluator(test: impl FnOnce(&Evaluator<'_>, &SchemaCatalog)) {
        let catalog = catalog();
        let tables = Tables::new();
        let plan = QueryFactory::new(&catalog).select_from("member").build().unwrap();
        let evaluator = Evaluator::new(&catalog, &tables, plan.plan()).unwrap();
        test(&evaluator, &catalog);
    }

    fn row(id: i64, username: Value, age: Value) -> Vec<Value> {
        vec![Value::Int(id), username, age]
    }

    #[test]
    fn test_comparisons() {
        with_evaluator(|ev, catalog| {
            let age = catalog.field("member", "age").unwrap();
            let member = row(1, Value::from("member1"), Value::Int(10));
            assert!(ev.matches(&age.eq(10).unwrap(), &member).unwrap());
            assert!(ev.matches(&age.lt(20).unwrap(), &member).unwrap());
            assert!(!ev.matches(&age.gt(10).unwrap(), &member).unwrap());
            assert!(ev.matches(&age.in_list([5, 10]).unwrap(), &member).unwrap());
        });
    }

    #[test]
    fn test_null_comparison_is_unknown() {
        with_evaluator(|ev, catalog| {
            let age = catalog.field("member", "age").unwrap();
            let member = row(1, Value::from("member1"), Value::Null);
            let eq = age.eq(10).unwrap();

            assert!(!ev.matches(&eq, &member).unwrap());
            // not(unknown) is still unknown
            assert!(!ev.matches(&eq.clone().negate(), &member).unwrap());
            assert!(ev.matches(&age.is_null(), &member).unwrap());
            // unknown or true is true
            assert!(ev.matches(&eq.or(age.is_null()), &member).unwrap());
        });
    }

    #[test]
    fn test_like_patterns() {
        let re = like_regex("member%").unwrap();
        assert!(re.is_match("member1"));
        assert!(re.is_match("member"));
        assert!(!re.is_match("a member"));

        let re = like_regex("m_mber.1").unwrap();
        assert!(re.is_match("member.1"));
        assert!(!re.is_match("memberx1"));

        with_evaluator(|ev, catalog| {
            let username = catalog.field("member", "username").unwrap();
            let member = row(1, Value::from("member1"), Value::Int(10));
            assert!(ev.matches(&username.like("%ber_").unwrap(), &member).unwrap());
            assert!(!ev.matches(&username.like("team%").unwrap(), &member).unwrap());
        });
    }

    #[test]
    fn test_functions_and_arithmetic() {
        with_evaluator(|ev, catalog| {
            let username = catalog.field("member", "username").unwrap();
            let age = catalog.field("member", "age").unwrap();
            let member = row(1, Value::from("Member1"), Value::Int(10));
            let scope = Scope::Row(&member);

            assert_eq!(
                ev.eval(&username.replace("Member", "M"), scope).unwrap(),
                Value::from("M1")
            );
            assert_eq!(ev.eval(&username.lower(), scope).unwrap(), Value::from("member1"));
            assert_eq!(ev.eval(&age.mul(2), scope).unwrap(), Value::Int(20));
            assert_eq!(ev.eval(&age.add(0.5), scope).unwrap(), Value::Decimal(10.5));

            let nameless = row(2, Value::Null, Value::Null);
            assert_eq!(ev.eval(&username.upper(), Scope::Row(&nameless)).unwrap(), Value::Null);
            assert_eq!(ev.eval(&age.add(1), Scope::Row(&nameless)).unwrap(), Value::Null);
        });
    }

    #[test]
    fn test_aggregate_requires_group() {
        with_evaluator(|ev, catalog| {
            let age = catalog.field("member", "age").unwrap();
            let a = row(1, Value::from("member1"), Value::Int(10));
            let b = row(2, Value::from("member2"), Value::Int(20));

            assert!(ev.eval(&age.sum(), Scope::Row(&a)).is_err());

            let group: Vec<&[Value]> = vec![&a, &b];
            assert_eq!(ev.eval(&age.sum(), Scope::Group(&group)).unwrap(), Value::Int(30));
            assert_eq!(ev.eval(&Expr::count_rows(), Scope::Group(&group)).unwrap(), Value::Int(2));
        });
    }

    #[test]
    fn test_field_outside_layout() {
        with_evaluator(|ev, _| {
            let stranger = FieldRef::new("team", "name", ValueType::String);
            assert_eq!(ev.position(&stranger).unwrap_err().code(), "AERO_SOURCE_EVALUATION");
        });
    }
}
