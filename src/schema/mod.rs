//! Schema subsystem for aeroquery
//!
//! Field references, value types and the catalog used to type-check queries
//! when they are constructed.
//!
//! # Design Principles
//!
//! - Field handles are created once and shared, never mutated
//! - Literal types are checked when a predicate is built, not when it runs
//! - No coercion between strings and numbers

mod catalog;
mod errors;
mod field;
mod types;

pub use catalog::{EntityDef, EntitySchema, FieldDef, RelationDef, SchemaCatalog};
pub use errors::{SchemaError, SchemaResult};
pub use field::{FieldRef, Relation};
pub use types::{FromValue, Value, ValueType};
