//! Per-execution context: deadline and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::errors::{ExecutorError, ExecutorResult};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Limits applied to one execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl ExecutionContext {
    /// No deadline, not cancellable
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fails if the execution was cancelled or ran past its deadline
    pub fn check(&self) -> ExecutorResult<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(ExecutorError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ExecutorError::DeadlineExceeded);
        }
        Ok(())
    }
}
