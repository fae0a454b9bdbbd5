//! Value types for queryable columns
//!
//! Supported types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - decimal: 64-bit floating point
//!
//! `Null` is a runtime value only. It may appear in rows but never as a
//! comparison literal.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Decimal,
}

impl ValueType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Decimal => "decimal",
        }
    }

    /// Returns true for int and decimal
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Decimal)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Runtime column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Decimal(f64),
    String(String),
}

impl Value {
    /// Returns the value's type, or `None` for null
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ValueType::Int),
            Value::Decimal(_) => Some(ValueType::Decimal),
            Value::String(_) => Some(ValueType::String),
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.value_type().map_or("null", |t| t.type_name())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of int and decimal values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// SQL-style comparison.
    ///
    /// Null compares to nothing. Int and decimal compare numerically,
    /// strings lexicographically, any other pairing is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// SQL-style equality (null never equals anything, not even null)
    pub fn sql_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Total ordering used for sorting: null first, then numbers, then strings
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        let rank = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Int(_) | Value::Decimal(_) => 1,
                Value::String(_) => 2,
            }
        };
        match rank(self).cmp(&rank(other)) {
            Ordering::Equal => self.compare(other).unwrap_or(Ordering::Equal),
            ordering => ordering,
        }
    }

    /// Converts to a JSON value for output
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Decimal(d) => serde_json::Value::from(*d),
            Value::String(s) => serde_json::Value::from(s.as_str()),
        }
    }

    /// Renders the value as a query literal (strings quoted)
    pub fn to_literal(&self) -> String {
        match self {
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

/// Conversion from a runtime value into a typed Rust value.
///
/// Backs typed tuple access and constructor arguments.
pub trait FromValue: Sized {
    /// Name of the expected type for error messages
    fn expected() -> &'static str;

    /// Converts the value, or returns `None` if the type does not fit
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for Value {
    fn expected() -> &'static str {
        "any"
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for String {
    fn expected() -> &'static str {
        "string"
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn expected() -> &'static str {
        "int"
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for i32 {
    fn expected() -> &'static str {
        "int"
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for f64 {
    fn expected() -> &'static str {
        "decimal"
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_f64()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn expected() -> &'static str {
        T::expected()
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::from("a").value_type(), Some(ValueType::String));
        assert_eq!(Value::from(1).value_type(), Some(ValueType::Int));
        assert_eq!(Value::from(1.5).value_type(), Some(ValueType::Decimal));
        assert_eq!(Value::Null.value_type(), None);
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn test_null_never_equal() {
        assert!(!Value::Null.sql_eq(&Value::Null));
        assert!(!Value::Null.sql_eq(&Value::Int(1)));
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_numeric_cross_compare() {
        assert!(Value::Int(25).sql_eq(&Value::Decimal(25.0)));
        assert_eq!(
            Value::Int(10).compare(&Value::Decimal(10.5)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_no_string_number_coercion() {
        assert_eq!(Value::from("123").compare(&Value::Int(123)), None);
    }

    #[test]
    fn test_sort_nulls_first() {
        let mut values = vec![Value::from("b"), Value::Int(3), Value::Null, Value::Int(1)];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![Value::Null, Value::Int(1), Value::Int(3), Value::from("b")]
        );
    }

    #[test]
    fn test_from_value_conversions() {
        assert_eq!(String::from_value(Value::from("x")), Some("x".to_string()));
        assert_eq!(i64::from_value(Value::from("x")), None);
        assert_eq!(f64::from_value(Value::Int(2)), Some(2.0));
        assert_eq!(Option::<i64>::from_value(Value::Null), Some(None));
        assert_eq!(i32::from_value(Value::Int(i64::MAX)), None);
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Value::from("it's").to_literal(), "'it''s'");
        assert_eq!(Value::Int(7).to_literal(), "7");
    }

    #[test]
    fn test_json_roundtrip_shape() {
        let parsed: Vec<Value> = serde_json::from_str(r#"[null, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![Value::Null, Value::Int(3), Value::Decimal(2.5), Value::from("x")]
        );
    }
}
