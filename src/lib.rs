//! aeroquery - type-safe composable queries with pluggable projection
//!
//! Predicates are built from schema-checked field handles, composed into
//! immutable `QueryPlan`s by a `QueryFactory`, executed by a `QueryExecutor`
//! against any `DataSource`, and mapped into tuples, scalars or DTOs by a
//! `Projector`.

pub mod cache;
pub mod cli;
pub mod config;
pub mod executor;
pub mod memory;
pub mod observability;
pub mod planner;
pub mod projection;
pub mod sample;
pub mod schema;
