//! Result projection
//!
//! Maps positional result rows into a target shape:
//!
//! - `Tuple`: raw heterogeneous access by field, expression, label or index
//! - scalar: a single converted column
//! - bean: `Default` target populated through `set_property`
//! - field: target populated directly through serde
//! - constructor: positional arguments, checked at plan build (`TypedConstructor`)
//!   or only when rows are mapped (legacy `ConstructorTarget`)

mod errors;
mod projector;
mod spec;
mod target;
mod tuple;

pub use errors::{convert, ProjectionError, ProjectionResult};
pub use projector::{Projection, Projections, Projector};
pub use spec::{ProjectionKind, ProjectionSpec};
pub use target::{Args, BeanTarget, ConstructorTarget, FieldTarget, TypedConstructor};
pub use tuple::{Tuple, TupleKey};
