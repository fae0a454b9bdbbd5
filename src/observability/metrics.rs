//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for plan construction and execution.
///
/// Counters use Relaxed ordering; readers see eventually consistent values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    plans_built: AtomicU64,
    plans_rejected: AtomicU64,
    queries_executed: AtomicU64,
    queries_failed: AtomicU64,
    rows_projected: AtomicU64,
    rows_mutated: AtomicU64,
    cache_invalidations: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_plans_built(&self) {
        self.plans_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_rejected(&self) {
        self.plans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows_projected(&self, rows: u64) {
        self.rows_projected.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn add_rows_mutated(&self, rows: u64) {
        self.rows_mutated.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_cache_invalidations(&self) {
        self.cache_invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_built: self.plans_built.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            rows_projected: self.rows_projected.load(Ordering::Relaxed),
            rows_mutated: self.rows_mutated.load(Ordering::Relaxed),
            cache_invalidations: self.cache_invalidations.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub plans_built: u64,
    pub plans_rejected: u64,
    pub queries_executed: u64,
    pub queries_failed: u64,
    pub rows_projected: u64,
    pub rows_mutated: u64,
    pub cache_invalidations: u64,
}
