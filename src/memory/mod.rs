//! Reference in-memory data source
//!
//! Evaluates plans by scanning rows. No indexes, no durability, no
//! transactions: it exists to run the query core end to end.

mod aggregate;
mod evaluator;
mod sorter;
mod source;

pub use source::MemoryDataSource;
