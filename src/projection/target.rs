//! Target types for projections
//!
//! Rust has no runtime reflection, so each strategy is a trait the target
//! implements. Bean targets go through a setter, field targets are written
//! directly through serde, constructor targets receive positional arguments.

use serde::de::DeserializeOwned;

use crate::schema::{FromValue, Value, ValueType};

use super::errors::{convert, ProjectionError, ProjectionResult};

/// Default-constructed target populated through named setters
pub trait BeanTarget: Default {
    const TYPE_NAME: &'static str;

    /// Sets one property; an unknown name must fail with `UnmatchedColumn`
    fn set_property(&mut self, name: &str, value: Value) -> ProjectionResult<()>;
}

/// Target whose fields are written directly, bypassing setters
pub trait FieldTarget: DeserializeOwned {
    const TYPE_NAME: &'static str;

    /// Names of the writable fields
    const FIELDS: &'static [&'static str];
}

/// Target built from positional constructor arguments.
///
/// On its own this is the legacy path: argument mismatches only surface when
/// a row is projected. Prefer `TypedConstructor`.
pub trait ConstructorTarget: Sized {
    const TYPE_NAME: &'static str;

    fn construct(args: Vec<Value>) -> ProjectionResult<Self>;
}

/// Constructor target with declared parameter types, checked at plan build
pub trait TypedConstructor: ConstructorTarget {
    const PARAMS: &'static [(&'static str, ValueType)];
}

/// Positional argument reader for `ConstructorTarget::construct`
pub struct Args {
    target: &'static str,
    values: std::vec::IntoIter<Value>,
}

impl Args {
    /// Fails unless exactly `expected` arguments were supplied
    pub fn new(target: &'static str, values: Vec<Value>, expected: usize) -> ProjectionResult<Self> {
        if values.len() != expected {
            return Err(ProjectionError::arity(target, expected, values.len()));
        }
        Ok(Self {
            target,
            values: values.into_iter(),
        })
    }

    /// Reads the next argument as `V`
    pub fn next<V: FromValue>(&mut self, name: &str) -> ProjectionResult<V> {
        let value = self
            .values
            .next()
            .ok_or_else(|| ProjectionError::MissingColumn(name.to_string()))?;
        convert(self.target, name, value)
    }
}
