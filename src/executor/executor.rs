//! Query executor
//!
//! Runs validated plans against a `DataSource`.
//!
//! Read flow (strict order):
//! 1. Check cancellation and deadline
//! 2. Fetch rows from the source (one call per execution)
//! 3. Enforce the configured row maximum
//! 4. Project rows lazily as the caller iterates
//!
//! Write flow:
//! 1. Check the plan kind and the execution context
//! 2. Apply the mutation at the source
//! 3. Notify every registered cache of the written entity
//!
//! Source errors are surfaced verbatim and never retried.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheInvalidation;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};
use crate::planner::{PlanKind, QueryPlan, Select};
use crate::projection::Projector;

use super::context::ExecutionContext;
use super::errors::{ExecutorError, ExecutorResult};
use super::result::{MutationResult, Rows};
use super::source::DataSource;

/// Executor limits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutorConfig {
    /// Largest result set a single fetch may return
    pub max_rows: Option<usize>,
    /// Deadline applied when the caller supplies no context
    pub default_timeout: Option<Duration>,
}

/// Executes plans against a data source
pub struct QueryExecutor<'a> {
    source: &'a dyn DataSource,
    config: ExecutorConfig,
    metrics: Arc<MetricsRegistry>,
    caches: Vec<Arc<dyn CacheInvalidation>>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(source: &'a dyn DataSource) -> Self {
        Self {
            source,
            config: ExecutorConfig::default(),
            metrics: Arc::new(MetricsRegistry::new()),
            caches: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Registers a cache to be invalidated after bulk writes
    pub fn register_cache(&mut self, cache: Arc<dyn CacheInvalidation>) {
        self.caches.push(cache);
    }

    pub fn source(&self) -> &'a dyn DataSource {
        self.source
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Context used when the caller supplies none
    pub fn default_context(&self) -> ExecutionContext {
        match self.config.default_timeout {
            Some(timeout) => ExecutionContext::new().with_timeout(timeout),
            None => ExecutionContext::new(),
        }
    }

    /// Fetches once and returns the rows for lazy projection
    pub fn stream<T>(&self, select: &Select<T>, ctx: &ExecutionContext) -> ExecutorResult<Rows<T>> {
        self.open(select.plan(), select.projector(), ctx)
    }

    /// Fetches and projects every row
    pub fn fetch<T>(&self, select: &Select<T>) -> ExecutorResult<Vec<T>> {
        self.fetch_with(select, &self.default_context())
    }

    pub fn fetch_with<T>(&self, select: &Select<T>, ctx: &ExecutionContext) -> ExecutorResult<Vec<T>> {
        self.stream(select, ctx)?.collect_all()
    }

    /// Exactly one row; none is `EmptyResult`, several is `AmbiguousResult`
    pub fn fetch_one<T>(&self, select: &Select<T>) -> ExecutorResult<T> {
        self.fetch_one_with(select, &self.default_context())
    }

    pub fn fetch_one_with<T>(&self, select: &Select<T>, ctx: &ExecutionContext) -> ExecutorResult<T> {
        let mut rows = self.stream(select, ctx)?;
        match rows.remaining() {
            0 => Err(ExecutorError::EmptyResult),
            1 => rows.next().unwrap_or(Err(ExecutorError::EmptyResult)),
            count => Err(ExecutorError::AmbiguousResult { count }),
        }
    }

    /// First row, if any. The source is asked for at most one row.
    pub fn fetch_first<T>(&self, select: &Select<T>) -> ExecutorResult<Option<T>> {
        let limit = select.plan().limit().map_or(1, |l| l.min(1));
        let plan = select.plan().with_limit(limit);
        let mut rows = self.open(&plan, select.projector(), &self.default_context())?;
        rows.next().transpose()
    }

    /// Runs a bulk update, bypassing any entity cache
    pub fn execute_update(&self, plan: &QueryPlan) -> ExecutorResult<MutationResult> {
        self.execute_update_with(plan, &self.default_context())
    }

    /// Bulk update that is skipped when `ctx` is already cancelled or expired
    pub fn execute_update_with(
        &self,
        plan: &QueryPlan,
        ctx: &ExecutionContext,
    ) -> ExecutorResult<MutationResult> {
        self.mutate(plan, ctx, PlanKind::Update, Event::BulkUpdate)
    }

    /// Runs a bulk delete, bypassing any entity cache
    pub fn execute_delete(&self, plan: &QueryPlan) -> ExecutorResult<MutationResult> {
        self.execute_delete_with(plan, &self.default_context())
    }

    pub fn execute_delete_with(
        &self,
        plan: &QueryPlan,
        ctx: &ExecutionContext,
    ) -> ExecutorResult<MutationResult> {
        self.mutate(plan, ctx, PlanKind::Delete, Event::BulkDelete)
    }

    fn open<T>(
        &self,
        plan: &QueryPlan,
        projector: Projector<T>,
        ctx: &ExecutionContext,
    ) -> ExecutorResult<Rows<T>> {
        if plan.kind() != PlanKind::Read {
            return Err(ExecutorError::wrong_kind(PlanKind::Read, plan.kind()));
        }

        let scope = ObservationScope::with_fields(
            Event::QueryFetch.as_str(),
            &[("source", plan.source())],
        );
        let fetched = ctx.check().and_then(|()| {
            let rows = self.source.fetch(plan)?;
            if let Some(max_rows) = self.config.max_rows {
                if rows.len() > max_rows {
                    return Err(ExecutorError::ExecutionLimit {
                        rows: rows.len(),
                        max_rows,
                    });
                }
            }
            ctx.check()?;
            Ok(rows)
        });

        match fetched {
            Ok(rows) => {
                self.metrics.increment_queries_executed();
                let count = rows.len().to_string();
                scope.complete_with_fields(&[("rows", count.as_str())]);
                Ok(Rows::new(
                    rows,
                    plan.selection().clone(),
                    projector,
                    ctx.clone(),
                    Arc::clone(&self.metrics),
                ))
            }
            Err(e) => Err(self.failed(scope, e)),
        }
    }

    fn mutate(
        &self,
        plan: &QueryPlan,
        ctx: &ExecutionContext,
        expected: PlanKind,
        event: Event,
    ) -> ExecutorResult<MutationResult> {
        if plan.kind() != expected {
            return Err(ExecutorError::wrong_kind(expected, plan.kind()));
        }

        let scope = ObservationScope::with_fields(event.as_str(), &[("entity", plan.source())]);
        let outcome = ctx
            .check()
            .and_then(|()| self.source.mutate(plan).map_err(ExecutorError::from));

        let affected = match outcome {
            Ok(affected) => affected,
            Err(e) => return Err(self.failed(scope, e)),
        };
        self.metrics.increment_queries_executed();
        self.metrics.add_rows_mutated(affected);
        let affected_field = affected.to_string();
        scope.complete_with_fields(&[("affected", affected_field.as_str())]);

        let invalidation_required = affected > 0;
        if invalidation_required {
            self.invalidate(plan.source());
        }
        Ok(MutationResult {
            affected,
            invalidation_required,
        })
    }

    fn invalidate(&self, entity: &str) {
        for cache in &self.caches {
            cache.invalidate(entity);
            self.metrics.increment_cache_invalidations();
        }
        if !self.caches.is_empty() {
            let caches = self.caches.len().to_string();
            log_event_with_fields(
                Event::CacheInvalidated,
                &[("entity", entity), ("caches", caches.as_str())],
            );
        }
    }

    fn failed(&self, scope: ObservationScope<'_>, error: ExecutorError) -> ExecutorError {
        self.metrics.increment_queries_failed();
        if error.is_abort() {
            log_event_with_fields(
                Event::ExecutionAborted,
                &[("execution_id", scope.execution_id()), ("code", error.code())],
            );
        }
        scope.fail(error.root_code(), &error.to_string());
        error
    }
}
