//! Observable events
//!
//! Events are explicit and typed. Scoped operations (`QUERY_FETCH`,
//! `BULK_UPDATE`, `BULK_DELETE`) derive their `_BEGIN`/`_COMPLETE`/`_FAILED`
//! names from `Event::scope_name`.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration loaded
    ConfigLoaded,
    /// Schema catalog loaded
    CatalogLoaded,
    /// Plan passed validation
    PlanBuilt,
    /// Plan rejected at build time
    PlanRejected,
    /// Read executed
    QueryFetch,
    /// Bulk update executed
    BulkUpdate,
    /// Bulk delete executed
    BulkDelete,
    /// Entity cache invalidated after a bulk write
    CacheInvalidated,
    /// Execution aborted by cancellation or deadline
    ExecutionAborted,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CatalogLoaded => "CATALOG_LOADED",
            Event::PlanBuilt => "PLAN_BUILT",
            Event::PlanRejected => "PLAN_REJECTED",
            Event::QueryFetch => "QUERY_FETCH",
            Event::BulkUpdate => "BULK_UPDATE",
            Event::BulkDelete => "BULK_DELETE",
            Event::CacheInvalidated => "CACHE_INVALIDATED",
            Event::ExecutionAborted => "EXECUTION_ABORTED",
        }
    }

    /// Prefix for scoped events, `None` for single-line events
    pub fn scope_name(&self) -> Option<&'static str> {
        match self {
            Event::QueryFetch | Event::BulkUpdate | Event::BulkDelete => Some(self.as_str()),
            _ => None,
        }
    }

    /// Severity used when the event is logged as a single line
    pub fn severity(&self) -> Severity {
        match self {
            Event::PlanBuilt => Severity::Trace,
            Event::PlanRejected | Event::ExecutionAborted => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::PlanBuilt.as_str(), "PLAN_BUILT");
        assert_eq!(Event::CacheInvalidated.to_string(), "CACHE_INVALIDATED");
    }

    #[test]
    fn test_scoped_events() {
        assert_eq!(Event::QueryFetch.scope_name(), Some("QUERY_FETCH"));
        assert_eq!(Event::BulkDelete.scope_name(), Some("BULK_DELETE"));
        assert_eq!(Event::PlanBuilt.scope_name(), None);
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::PlanRejected.severity(), Severity::Warn);
        assert_eq!(Event::PlanBuilt.severity(), Severity::Trace);
        assert_eq!(Event::CacheInvalidated.severity(), Severity::Info);
    }
}
