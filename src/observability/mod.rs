//! Observability
//!
//! - Structured logging (JSON lines on stderr)
//! - Counters
//! - Scoped begin/complete tracing with execution ids
//!
//! Observability is read-only: it never changes the outcome of a query.
//!
//! ```ignore
//! use aeroquery::observability::{Logger, MetricsRegistry, ObservationScope};
//!
//! Logger::info("PLAN_BUILT", &[("source", "member")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_queries_executed();
//!
//! let scope = ObservationScope::new("QUERY_FETCH");
//! scope.complete();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a single-line event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a single-line event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
