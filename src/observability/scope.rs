//! ObservationScope for begin/complete logging around one operation
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` on `complete()`
//! - Logs `{name}_FAILED` on `fail()`
//! - Logs `{name}_INCOMPLETE` if dropped without either

use std::cell::Cell;
use std::time::Instant;

use uuid::Uuid;

use super::logger::Logger;

/// A scope that logs the lifecycle of one execution.
///
/// Every line carries the same `execution_id`, so begin and end events of
/// concurrent executions can be paired.
///
/// ```ignore
/// let scope = ObservationScope::with_fields("QUERY_FETCH", &[("source", "member")]);
/// // ... do work ...
/// scope.complete_with_fields(&[("rows", "4")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    execution_id: String,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    timer: Timer,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope with additional fields
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let scope = Self {
            name,
            execution_id: Uuid::new_v4().to_string(),
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
        };
        Logger::info(&format!("{}_BEGIN", name), &scope.field_refs(&[]));
        scope
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Logs `{name}_COMPLETE`
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Logs `{name}_COMPLETE` with additional fields and elapsed time
    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.timer.elapsed_ms();
        let mut extra = extra_fields.to_vec();
        extra.push(("elapsed_ms", elapsed.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.name), &self.field_refs(&extra));
    }

    /// Logs `{name}_FAILED` at ERROR level
    pub fn fail(self, code: &str, reason: &str) {
        self.completed.set(true);
        Logger::error(
            &format!("{}_FAILED", self.name),
            &self.field_refs(&[("code", code), ("reason", reason)]),
        );
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    fn field_refs<'s>(&'s self, extra: &[(&'s str, &'s str)]) -> Vec<(&'s str, &'s str)> {
        let mut refs: Vec<(&str, &str)> = vec![("execution_id", self.execution_id.as_str())];
        refs.extend(self.fields.iter().map(|(k, v)| (*k, v.as_str())));
        refs.extend_from_slice(extra);
        refs
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            let event = format!("{}_INCOMPLETE", self.name);
            Logger::warn(
                &event,
                &[
                    ("execution_id", self.execution_id.as_str()),
                    ("reason", "scope dropped without completion"),
                ],
            );
        }
    }
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_complete() {
        let scope = ObservationScope::with_fields("TEST", &[("source", "member")]);
        assert!(!scope.is_completed());
        scope.complete_with_fields(&[("rows", "4")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new("TEST");
        scope.fail("AERO_TEST", "something went wrong");
    }

    #[test]
    fn test_execution_ids_are_unique() {
        let a = ObservationScope::new("TEST");
        let b = ObservationScope::new("TEST");
        assert_ne!(a.execution_id(), b.execution_id());
        assert!(Uuid::parse_str(a.execution_id()).is_ok());
        a.complete();
        b.complete();
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new("TEST");
        drop(scope);
    }
}
