//! Result types for query execution

use std::sync::Arc;
use std::vec;

use crate::observability::MetricsRegistry;
use crate::projection::{ProjectionSpec, Projector};

use super::context::ExecutionContext;
use super::errors::ExecutorResult;
use super::source::ResultRow;

/// Projected rows of one fetch.
///
/// Finite and consuming: each row is projected once, when it is reached.
/// Cancellation and the deadline are checked before every row. After the
/// first error the iterator yields nothing further.
pub struct Rows<T> {
    rows: vec::IntoIter<ResultRow>,
    selection: ProjectionSpec,
    projector: Projector<T>,
    ctx: ExecutionContext,
    metrics: Arc<MetricsRegistry>,
    done: bool,
}

impl<T> Rows<T> {
    pub(crate) fn new(
        rows: Vec<ResultRow>,
        selection: ProjectionSpec,
        projector: Projector<T>,
        ctx: ExecutionContext,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            rows: rows.into_iter(),
            selection,
            projector,
            ctx,
            metrics,
            done: false,
        }
    }

    /// Rows not yet consumed
    pub fn remaining(&self) -> usize {
        if self.done {
            0
        } else {
            self.rows.len()
        }
    }

    /// Projects every remaining row, stopping at the first error
    pub fn collect_all(self) -> ExecutorResult<Vec<T>> {
        self.collect()
    }
}

impl<T> Iterator for Rows<T> {
    type Item = ExecutorResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let row = match self.rows.next() {
            Some(row) => row,
            None => {
                self.done = true;
                return None;
            }
        };
        let result = self.ctx.check().and_then(|()| {
            self.projector
                .project(&self.selection, row.into_values())
                .map_err(Into::into)
        });
        match &result {
            Ok(_) => self.metrics.add_rows_projected(1),
            Err(_) => self.done = true,
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

/// Outcome of a bulk update or delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationResult {
    /// Rows changed or removed
    pub affected: u64,
    /// Whether cached copies of the entity may now be stale.
    ///
    /// Registered caches have already been invalidated when this is returned;
    /// callers holding other copies must drop them.
    pub invalidation_required: bool,
}
