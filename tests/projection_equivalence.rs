//! Projection Strategy Tests
//!
//! The same username/age selection mapped through tuples, setters, fields
//! and constructors yields the same observable values. Constructor type
//! errors surface at plan build when parameters are declared, and only when
//! rows are mapped otherwise.

use aeroquery::executor::{DataSource, ExecutorError, QueryExecutor};
use aeroquery::memory::MemoryDataSource;
use aeroquery::planner::{PlannerError, QueryFactory, SortDirection};
use aeroquery::projection::{ProjectionError, Projections};
use aeroquery::sample::{seeded_source, MemberDto, QMember, UserDto, MEMBER};

fn setup() -> (MemoryDataSource, QMember) {
    let source = seeded_source().unwrap();
    let member = QMember::new(source.schema()).unwrap();
    (source, member)
}

fn expected() -> Vec<MemberDto> {
    (1..=4)
        .map(|i| MemberDto::new(format!("member{}", i), i * 10))
        .collect()
}

#[test]
fn test_all_strategies_agree() {
    let (source, m) = setup();
    let factory = QueryFactory::new(source.schema());
    let executor = QueryExecutor::new(&source);
    let columns = [&m.username, &m.age];

    let tuples = executor
        .fetch(
            &factory
                .select(Projections::tuple(columns))
                .from(MEMBER)
                .order_by(&m.id, SortDirection::Asc)
                .build()
                .unwrap(),
        )
        .unwrap();
    let from_tuples: Vec<MemberDto> = tuples
        .iter()
        .map(|t| {
            MemberDto::new(
                t.get_as::<String>(&m.username).unwrap(),
                t.get_as::<i64>("age").unwrap(),
            )
        })
        .collect();

    let beans = executor
        .fetch(
            &factory
                .select(Projections::bean::<MemberDto>(columns))
                .from(MEMBER)
                .build()
                .unwrap(),
        )
        .unwrap();
    let fields = executor
        .fetch(
            &factory
                .select(Projections::fields::<MemberDto>(columns))
                .from(MEMBER)
                .build()
                .unwrap(),
        )
        .unwrap();
    let constructed = executor
        .fetch(
            &factory
                .select(Projections::constructor::<MemberDto>(columns))
                .from(MEMBER)
                .build()
                .unwrap(),
        )
        .unwrap();
    let unchecked = executor
        .fetch(
            &factory
                .select(Projections::constructor_unchecked::<MemberDto>(columns))
                .from(MEMBER)
                .build()
                .unwrap(),
        )
        .unwrap();

    assert_eq!(from_tuples, expected());
    assert_eq!(beans, expected());
    assert_eq!(fields, expected());
    assert_eq!(constructed, expected());
    assert_eq!(unchecked, expected());
}

#[test]
fn test_tuple_access_by_index_and_label() {
    let (source, m) = setup();
    let factory = QueryFactory::new(source.schema());
    let select = factory
        .select(Projections::tuple([&m.username, &m.age]))
        .from(MEMBER)
        .filter(m.id.eq(3).unwrap())
        .build()
        .unwrap();

    let tuple = QueryExecutor::new(&source).fetch_one(&select).unwrap();
    assert_eq!(tuple.len(), 2);
    assert_eq!(tuple.get_as::<String>(0usize).unwrap(), "member3");
    assert_eq!(tuple.get_as::<i64>(&m.age).unwrap(), 30);
    assert!(tuple.get("missing").is_none());
}

/// Declared constructor parameters are checked before anything runs.
#[test]
fn test_checked_constructor_rejected_at_build() {
    let (source, m) = setup();
    let factory = QueryFactory::new(source.schema());
    let err = factory
        .select(Projections::constructor::<MemberDto>([&m.age, &m.username]))
        .from(MEMBER)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        PlannerError::Projection(ProjectionError::TypeMismatch { .. })
    ));
}

/// The legacy constructor builds fine and fails on the first row.
#[test]
fn test_unchecked_constructor_fails_when_mapping() {
    let (source, m) = setup();
    let factory = QueryFactory::new(source.schema());
    let select = factory
        .select(Projections::constructor_unchecked::<MemberDto>([&m.age, &m.username]))
        .from(MEMBER)
        .build()
        .unwrap();

    let err = QueryExecutor::new(&source).fetch(&select).unwrap_err();
    assert!(matches!(err, ExecutorError::Projection(_)));
}

/// Column labels must name a target field.
#[test]
fn test_field_projection_requires_matching_label() {
    let (source, m) = setup();
    let factory = QueryFactory::new(source.schema());
    let executor = QueryExecutor::new(&source);

    let unaliased = factory
        .select(Projections::fields::<UserDto>([&m.username, &m.age]))
        .from(MEMBER)
        .build()
        .unwrap();
    let err = executor.fetch(&unaliased).unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Projection(ProjectionError::UnmatchedColumn { .. })
    ));

    let aliased = factory
        .select(Projections::fields::<UserDto>([
            m.username.as_column("name"),
            m.age.as_column("age"),
        ]))
        .from(MEMBER)
        .build()
        .unwrap();
    let users = executor.fetch(&aliased).unwrap();
    assert_eq!(users[0].name, "member1");
    assert_eq!(users[0].age, 10);
}

/// A scalar sub-query evaluates once per plan, the same for every row.
#[test]
fn test_subquery_column() {
    let (source, m) = setup();
    let factory = QueryFactory::new(source.schema());
    let oldest = factory
        .select(Projections::tuple([m.age.max()]))
        .from(MEMBER)
        .build()
        .unwrap()
        .into_subquery();

    let select = factory
        .select(Projections::fields::<UserDto>([
            m.username.as_column("name"),
            oldest.as_column("age"),
        ]))
        .from(MEMBER)
        .build()
        .unwrap();
    let users = QueryExecutor::new(&source).fetch(&select).unwrap();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u.age == 40));
}

#[test]
fn test_scalar_functions() {
    let (source, m) = setup();
    let factory = QueryFactory::new(source.schema());
    let executor = QueryExecutor::new(&source);

    let replaced = factory
        .select(Projections::scalar::<String>(m.username.replace("member", "M")))
        .from(MEMBER)
        .build()
        .unwrap();
    assert_eq!(executor.fetch(&replaced).unwrap(), vec!["M1", "M2", "M3", "M4"]);

    let upper = factory
        .select(Projections::scalar::<String>(m.username.upper()))
        .from(MEMBER)
        .filter(m.id.eq(2).unwrap())
        .build()
        .unwrap();
    assert_eq!(executor.fetch_one(&upper).unwrap(), "MEMBER2");

    let already_lower = factory
        .select(Projections::scalar::<String>(&m.username))
        .from(MEMBER)
        .filter(m.username.eq_expr(m.username.lower()).unwrap())
        .build()
        .unwrap();
    assert_eq!(executor.fetch(&already_lower).unwrap().len(), 4);
}
