//! Tuple results
//!
//! Raw heterogeneous column access for multi-column selections that are not
//! mapped onto a target type.

use std::sync::Arc;

use crate::planner::{Column, Expr};
use crate::schema::{FieldRef, FromValue, Value};

use super::errors::{convert, ProjectionError, ProjectionResult};

/// Key used to look up a tuple column
pub trait TupleKey {
    /// Position of the column within the selection
    fn position(&self, columns: &[Column]) -> Option<usize>;

    /// Description for error messages
    fn describe(&self) -> String;
}

impl TupleKey for usize {
    fn position(&self, columns: &[Column]) -> Option<usize> {
        (*self < columns.len()).then_some(*self)
    }

    fn describe(&self) -> String {
        format!("#{}", self)
    }
}

/// Lookup by column label
impl TupleKey for &str {
    fn position(&self, columns: &[Column]) -> Option<usize> {
        columns.iter().position(|c| c.label() == *self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl TupleKey for &FieldRef {
    fn position(&self, columns: &[Column]) -> Option<usize> {
        columns
            .iter()
            .position(|c| matches!(c.expr(), Expr::Field(f) if f == *self))
    }

    fn describe(&self) -> String {
        self.qualified_name()
    }
}

impl TupleKey for &Expr {
    fn position(&self, columns: &[Column]) -> Option<usize> {
        columns.iter().position(|c| c.expr() == *self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// One projected row with its column descriptions
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Tuple {
    pub(crate) fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Value for a column, if selected
    pub fn get(&self, key: impl TupleKey) -> Option<&Value> {
        key.position(&self.columns).and_then(|i| self.values.get(i))
    }

    /// Typed value for a column
    pub fn get_as<V: FromValue>(&self, key: impl TupleKey) -> ProjectionResult<V> {
        let index = key
            .position(&self.columns)
            .ok_or_else(|| ProjectionError::MissingColumn(key.describe()))?;
        let value = self.values[index].clone();
        convert("tuple", self.columns[index].label(), value)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON object keyed by column label
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.label().to_string(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueType;

    fn sample() -> (FieldRef, FieldRef, Tuple) {
        let username = FieldRef::new("member", "username", ValueType::String);
        let age = FieldRef::new("member", "age", ValueType::Int);
        let columns: Arc<[Column]> = vec![
            Column::from(&username),
            Column::from(age.sum()),
        ]
        .into();
        let tuple = Tuple::new(columns, vec![Value::from("member1"), Value::Int(100)]);
        (username, age, tuple)
    }

    #[test]
    fn test_lookup_by_field_and_expr() {
        let (username, age, tuple) = sample();
        assert_eq!(tuple.get(&username), Some(&Value::from("member1")));
        assert_eq!(tuple.get(&age.sum()), Some(&Value::Int(100)));
        assert_eq!(tuple.get(&age), None);
        assert_eq!(tuple.get(1), Some(&Value::Int(100)));
        assert_eq!(tuple.get("username"), Some(&Value::from("member1")));
    }

    #[test]
    fn test_typed_access() {
        let (username, age, tuple) = sample();
        assert_eq!(tuple.get_as::<String>(&username).unwrap(), "member1");
        assert_eq!(tuple.get_as::<i64>(&age.sum()).unwrap(), 100);

        let err = tuple.get_as::<i64>(&username).unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_TYPE");

        let err = tuple.get_as::<i64>(&age.max()).unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_MISSING_COLUMN");
    }

    #[test]
    fn test_to_json() {
        let (_, _, tuple) = sample();
        let json = tuple.to_json();
        assert_eq!(json["username"], "member1");
        assert_eq!(json["sum(member.age)"], 100);
    }
}
