//! Query execution
//!
//! The executor consumes validated plans and produces projected results or
//! mutation counts. It owns no data: every plan runs against a `DataSource`.
//!
//! # Invariants
//!
//! - One source call per execution
//! - Rows are projected exactly once, in source order
//! - Source failures surface verbatim inside `ExecutorError::Execution`
//! - Registered caches are invalidated after every bulk write that changed rows

mod context;
mod errors;
mod executor;
mod result;
mod source;

pub use context::{CancellationToken, ExecutionContext};
pub use errors::{ExecutorError, ExecutorResult};
pub use executor::{ExecutorConfig, QueryExecutor};
pub use result::{MutationResult, Rows};
pub use source::{DataSource, DataSourceError, DataSourceResult, ResultRow};
