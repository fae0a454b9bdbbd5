//! Dynamic predicate construction
//!
//! `PredicateBuilder` accumulates optional conditions. An absent input never
//! constrains the result set. The builder lives for one query-construction
//! call and is not meant to be shared between threads.

use std::mem;

use crate::schema::{FieldRef, SchemaResult, Value};

use super::ast::{CompareOp, Operand, Predicate};

/// AND of two optional predicates; an absent side is the identity
pub fn and(left: Option<Predicate>, right: Option<Predicate>) -> Option<Predicate> {
    match (left, right) {
        (Some(l), Some(r)) => Some(l.and(r)),
        (l, r) => l.or(r),
    }
}

/// OR of two optional predicates; an absent side is the identity
pub fn or(left: Option<Predicate>, right: Option<Predicate>) -> Option<Predicate> {
    match (left, right) {
        (Some(l), Some(r)) => Some(l.or(r)),
        (l, r) => l.or(r),
    }
}

/// AND of any number of optional predicates
pub fn all_of(predicates: impl IntoIterator<Item = Option<Predicate>>) -> Option<Predicate> {
    predicates.into_iter().fold(None, and)
}

/// Accumulates optional conditions into one predicate
#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder {
    accumulated: Option<Predicate>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// ANDs a comparison if `value` is present; no-op otherwise.
    ///
    /// A present value of the wrong type is rejected immediately.
    pub fn and_if_present<V: Into<Value>>(
        &mut self,
        field: &FieldRef,
        op: CompareOp,
        value: Option<V>,
    ) -> SchemaResult<&mut Self> {
        if let Some(value) = value {
            let operand = match op {
                CompareOp::In => Operand::List(vec![value.into()]),
                _ => Operand::Value(value.into()),
            };
            let predicate = Predicate::comparison(field, op, operand)?;
            self.push_and(predicate);
        }
        Ok(self)
    }

    /// Equality that skips the condition when the input is absent
    pub fn eq_if_present<V: Into<Value>>(
        &mut self,
        field: &FieldRef,
        value: Option<V>,
    ) -> SchemaResult<&mut Self> {
        self.and_if_present(field, CompareOp::Eq, value)
    }

    /// Equality that matches NULL columns when the input is absent
    pub fn eq_or_is_null<V: Into<Value>>(
        &mut self,
        field: &FieldRef,
        value: Option<V>,
    ) -> SchemaResult<&mut Self> {
        match value {
            Some(value) => self.eq_if_present(field, Some(value)),
            None => {
                self.push_and(field.is_null());
                Ok(self)
            }
        }
    }

    /// ANDs an already-built predicate
    pub fn and(&mut self, predicate: Predicate) -> &mut Self {
        self.push_and(predicate);
        self
    }

    /// ANDs an optional predicate, skipping `None`
    pub fn and_opt(&mut self, predicate: Option<Predicate>) -> &mut Self {
        if let Some(predicate) = predicate {
            self.push_and(predicate);
        }
        self
    }

    /// ORs an already-built predicate onto everything accumulated so far
    pub fn or(&mut self, predicate: Predicate) -> &mut Self {
        let current = self.accumulated.take();
        self.accumulated = or(current, Some(predicate));
        self
    }

    /// True if no condition has been added
    pub fn is_empty(&self) -> bool {
        self.accumulated.is_none()
    }

    /// Accumulated predicate without consuming the builder
    pub fn current(&self) -> Option<&Predicate> {
        self.accumulated.as_ref()
    }

    /// Returns the accumulated predicate, or `Always` if nothing was added.
    ///
    /// The builder is left empty.
    pub fn build(&mut self) -> Predicate {
        mem::take(&mut self.accumulated).unwrap_or(Predicate::Always)
    }

    fn push_and(&mut self, predicate: Predicate) {
        let current = self.accumulated.take();
        self.accumulated = and(current, Some(predicate));
    }
}
