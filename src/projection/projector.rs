//! Projectors
//!
//! A `Projection<T>` pairs the selected columns with the function that maps a
//! row of those columns into `T`. The same column list yields equal observable
//! values whichever strategy is used to map it.

use std::fmt;
use std::marker::PhantomData;

use serde_json::Map;

use crate::planner::Column;
use crate::schema::{FromValue, Value, ValueType};

use super::errors::{convert, ProjectionError, ProjectionResult};
use super::spec::{ProjectionKind, ProjectionSpec};
use super::target::{BeanTarget, ConstructorTarget, FieldTarget, TypedConstructor};
use super::tuple::Tuple;

type MapFn<T> = fn(&ProjectionSpec, Vec<Value>) -> ProjectionResult<T>;

/// Maps positional rows into `T`
pub struct Projector<T> {
    map: MapFn<T>,
}

impl<T> Clone for Projector<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Projector<T> {}

impl<T> fmt::Debug for Projector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Projector")
    }
}

impl<T> Projector<T> {
    fn new(map: MapFn<T>) -> Self {
        Self { map }
    }

    /// Projects one row. The row is consumed.
    pub fn project(&self, spec: &ProjectionSpec, row: Vec<Value>) -> ProjectionResult<T> {
        if row.len() != spec.columns().len() {
            return Err(ProjectionError::arity(
                spec.target_name(),
                spec.columns().len(),
                row.len(),
            ));
        }
        (self.map)(spec, row)
    }
}

/// Selection plus projector, handed to `QueryFactory::select`
pub struct Projection<T> {
    spec: ProjectionSpec,
    projector: Projector<T>,
    params: Option<&'static [(&'static str, ValueType)]>,
    _target: PhantomData<fn() -> T>,
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            projector: self.projector,
            params: self.params,
            _target: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Projection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection").field("spec", &self.spec).finish()
    }
}

impl<T> Projection<T> {
    fn new(
        kind: ProjectionKind,
        target: Option<&'static str>,
        columns: Vec<Column>,
        map: MapFn<T>,
    ) -> Self {
        Self {
            spec: ProjectionSpec::new(kind, target, columns),
            projector: Projector::new(map),
            params: None,
            _target: PhantomData,
        }
    }

    pub fn spec(&self) -> &ProjectionSpec {
        &self.spec
    }

    pub fn projector(&self) -> Projector<T> {
        self.projector
    }

    pub(crate) fn into_parts(self) -> (ProjectionSpec, Projector<T>) {
        (self.spec, self.projector)
    }

    /// Checks declared constructor parameters against the selected columns.
    ///
    /// An int column may feed a decimal parameter; a null literal fits any.
    /// Projections without declared parameters always pass.
    pub fn check_columns(&self) -> ProjectionResult<()> {
        let Some(params) = self.params else {
            return Ok(());
        };
        let target = self.spec.target_name();
        let columns = self.spec.columns();
        if params.len() != columns.len() {
            return Err(ProjectionError::arity(target, params.len(), columns.len()));
        }
        for ((name, expected), column) in params.iter().zip(columns) {
            let fits = match column.expr().value_type() {
                None => true,
                Some(actual) => {
                    actual == *expected
                        || (actual == ValueType::Int && *expected == ValueType::Decimal)
                }
            };
            if !fits {
                return Err(ProjectionError::TypeMismatch {
                    target: target.to_string(),
                    name: name.to_string(),
                    expected: expected.type_name().to_string(),
                    actual: column
                        .expr()
                        .value_type()
                        .map(|t| t.type_name())
                        .unwrap_or("null")
                        .to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Constructors for every projection strategy
pub struct Projections;

impl Projections {
    /// Raw tuples
    pub fn tuple(columns: impl IntoIterator<Item = impl Into<Column>>) -> Projection<Tuple> {
        Projection::new(
            ProjectionKind::Tuple,
            None,
            collect(columns),
            project_tuple,
        )
    }

    /// Single column converted to `V`
    pub fn scalar<V: FromValue>(column: impl Into<Column>) -> Projection<V> {
        Projection::new(
            ProjectionKind::Scalar,
            None,
            vec![column.into()],
            project_scalar::<V>,
        )
    }

    /// Default-construct `T` and set each column through its setter
    pub fn bean<T: BeanTarget>(
        columns: impl IntoIterator<Item = impl Into<Column>>,
    ) -> Projection<T> {
        Projection::new(
            ProjectionKind::Bean,
            Some(T::TYPE_NAME),
            collect(columns),
            project_bean::<T>,
        )
    }

    /// Write each column directly into the field of the same name
    pub fn fields<T: FieldTarget>(
        columns: impl IntoIterator<Item = impl Into<Column>>,
    ) -> Projection<T> {
        Projection::new(
            ProjectionKind::Field,
            Some(T::TYPE_NAME),
            collect(columns),
            project_fields::<T>,
        )
    }

    /// Positional constructor with parameter types checked at plan build
    pub fn constructor<T: TypedConstructor>(
        columns: impl IntoIterator<Item = impl Into<Column>>,
    ) -> Projection<T> {
        let mut projection = Projection::new(
            ProjectionKind::Constructor { checked: true },
            Some(T::TYPE_NAME),
            collect(columns),
            project_constructor::<T>,
        );
        projection.params = Some(T::PARAMS);
        projection
    }

    /// Legacy positional constructor; mismatches surface when rows are mapped
    pub fn constructor_unchecked<T: ConstructorTarget>(
        columns: impl IntoIterator<Item = impl Into<Column>>,
    ) -> Projection<T> {
        Projection::new(
            ProjectionKind::Constructor { checked: false },
            Some(T::TYPE_NAME),
            collect(columns),
            project_constructor::<T>,
        )
    }
}

fn collect(columns: impl IntoIterator<Item = impl Into<Column>>) -> Vec<Column> {
    columns.into_iter().map(Into::into).collect()
}

fn project_tuple(spec: &ProjectionSpec, values: Vec<Value>) -> ProjectionResult<Tuple> {
    Ok(Tuple::new(spec.shared_columns(), values))
}

fn project_scalar<V: FromValue>(spec: &ProjectionSpec, values: Vec<Value>) -> ProjectionResult<V> {
    let label = spec.columns()[0].label();
    let value = values.into_iter().next().unwrap_or(Value::Null);
    convert("scalar", label, value)
}

fn project_bean<T: BeanTarget>(spec: &ProjectionSpec, values: Vec<Value>) -> ProjectionResult<T> {
    let mut target = T::default();
    for (column, value) in spec.columns().iter().zip(values) {
        target.set_property(column.label(), value)?;
    }
    Ok(target)
}

fn project_fields<T: FieldTarget>(spec: &ProjectionSpec, values: Vec<Value>) -> ProjectionResult<T> {
    let mut map = Map::new();
    for (column, value) in spec.columns().iter().zip(values) {
        if !T::FIELDS.contains(&column.label()) {
            return Err(ProjectionError::unmatched(T::TYPE_NAME, column.label()));
        }
        map.insert(column.label().to_string(), value.to_json());
    }
    serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| {
        ProjectionError::Deserialize {
            target: T::TYPE_NAME.to_string(),
            reason: e.to_string(),
        }
    })
}

fn project_constructor<T: ConstructorTarget>(
    _spec: &ProjectionSpec,
    values: Vec<Value>,
) -> ProjectionResult<T> {
    T::construct(values)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::projection::target::Args;
    use crate::schema::FieldRef;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Dto {
        username: String,
        age: i64,
    }

    impl BeanTarget for Dto {
        const TYPE_NAME: &'static str = "Dto";

        fn set_property(&mut self, name: &str, value: Value) -> ProjectionResult<()> {
            match name {
                "username" => self.username = convert("Dto", name, value)?,
                "age" => self.age = convert("Dto", name, value)?,
                other => return Err(ProjectionError::unmatched("Dto", other)),
            }
            Ok(())
        }
    }

    impl FieldTarget for Dto {
        const TYPE_NAME: &'static str = "Dto";
        const FIELDS: &'static [&'static str] = &["username", "age"];
    }

    impl ConstructorTarget for Dto {
        const TYPE_NAME: &'static str = "Dto";

        fn construct(args: Vec<Value>) -> ProjectionResult<Self> {
            let mut args = Args::new("Dto", args, 2)?;
            Ok(Dto {
                username: args.next("username")?,
                age: args.next("age")?,
            })
        }
    }

    impl TypedConstructor for Dto {
        const PARAMS: &'static [(&'static str, ValueType)] =
            &[("username", ValueType::String), ("age", ValueType::Int)];
    }

    fn username() -> FieldRef {
        FieldRef::new("member", "username", ValueType::String)
    }

    fn age() -> FieldRef {
        FieldRef::new("member", "age", ValueType::Int)
    }

    fn row() -> Vec<Value> {
        vec![Value::from("member1"), Value::Int(10)]
    }

    fn expected() -> Dto {
        Dto {
            username: "member1".to_string(),
            age: 10,
        }
    }

    #[test]
    fn test_strategies_agree() {
        let columns = [username(), age()];

        let p = Projections::bean::<Dto>(columns.clone());
        assert_eq!(p.projector().project(p.spec(), row()).unwrap(), expected());

        let p = Projections::fields::<Dto>(columns.clone());
        assert_eq!(p.projector().project(p.spec(), row()).unwrap(), expected());

        let p = Projections::constructor::<Dto>(columns.clone());
        assert_eq!(p.projector().project(p.spec(), row()).unwrap(), expected());

        let p = Projections::tuple(columns);
        let tuple = p.projector().project(p.spec(), row()).unwrap();
        assert_eq!(tuple.get_as::<String>(&username()).unwrap(), "member1");
        assert_eq!(tuple.get_as::<i64>(&age()).unwrap(), 10);
    }

    #[test]
    fn test_unmatched_column() {
        let columns = [username(), FieldRef::new("member", "nickname", ValueType::String)];

        let p = Projections::bean::<Dto>(columns.clone());
        let err = p
            .projector()
            .project(p.spec(), vec![Value::from("a"), Value::from("b")])
            .unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_UNMATCHED_COLUMN");

        let p = Projections::fields::<Dto>(columns);
        let err = p
            .projector()
            .project(p.spec(), vec![Value::from("a"), Value::from("b")])
            .unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_UNMATCHED_COLUMN");
    }

    #[test]
    fn test_row_length_checked() {
        let p = Projections::tuple([username()]);
        let err = p.projector().project(p.spec(), row()).unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_ARITY");
    }

    #[test]
    fn test_checked_constructor_columns() {
        assert!(Projections::constructor::<Dto>([username(), age()])
            .check_columns()
            .is_ok());

        let err = Projections::constructor::<Dto>([username()])
            .check_columns()
            .unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_ARITY");

        let err = Projections::constructor::<Dto>([age(), username()])
            .check_columns()
            .unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_TYPE");
    }

    #[test]
    fn test_unchecked_constructor_fails_on_rows() {
        let p = Projections::constructor_unchecked::<Dto>([age(), username()]);
        assert!(p.check_columns().is_ok());
        let err = p
            .projector()
            .project(p.spec(), vec![Value::Int(10), Value::from("member1")])
            .unwrap_err();
        assert_eq!(err.code(), "AERO_PROJECTION_TYPE");
    }

    #[test]
    fn test_scalar() {
        let p = Projections::scalar::<i64>(age().sum());
        assert_eq!(p.projector().project(p.spec(), vec![Value::Int(100)]).unwrap(), 100);
    }
}
