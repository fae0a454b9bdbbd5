//! Query construction
//!
//! - `ast`: predicate tree, type-checked at construction
//! - `builder`: dynamic predicate accumulation from optional inputs
//! - `expr`: aggregates, SQL functions, arithmetic and sub-queries
//! - `plan`: immutable, re-executable query plans
//! - `factory`: plan builders validated against a schema catalog
//! - `explain`: deterministic plan descriptions
//!
//! Plans are immutable and `Send + Sync`. There is no global state: every
//! construction call receives its `QueryFactory` explicitly.

mod ast;
mod builder;
mod errors;
mod explain;
mod expr;
mod factory;
mod plan;

pub use ast::{CompareOp, Operand, Predicate};
pub use builder::{all_of, and, or, PredicateBuilder};
pub use errors::{PlannerError, PlannerResult};
pub use explain::ExplainPlan;
pub use expr::{AggregateFn, ArithOp, Column, Expr, SqlFunction};
pub use factory::{DeleteBuilder, QueryFactory, Select, SelectBuilder, UpdateBuilder};
pub use plan::{Assignment, OrderSpec, PlanKind, QueryPlan, SortDirection};
