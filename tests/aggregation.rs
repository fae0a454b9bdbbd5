//! Aggregation and Grouping Tests
//!
//! Ages are {10, 20, 30, 40}; teamA holds {10, 20} and teamB {30, 40}.

use aeroquery::executor::{DataSource, QueryExecutor};
use aeroquery::memory::MemoryDataSource;
use aeroquery::planner::{Expr, PlannerError, QueryFactory, SortDirection};
use aeroquery::projection::Projections;
use aeroquery::sample::{catalog, seeded_source, QMember, QTeam, MEMBER};
use aeroquery::schema::Value;

fn setup() -> (MemoryDataSource, QMember, QTeam) {
    let source = seeded_source().unwrap();
    let member = QMember::new(source.schema()).unwrap();
    let team = QTeam::new(source.schema()).unwrap();
    (source, member, team)
}

#[test]
fn test_count_sum_avg_max_min() {
    let (source, m, _team) = setup();
    let select = QueryFactory::new(source.schema())
        .select(Projections::tuple([
            Expr::count_rows(),
            m.age.sum(),
            m.age.avg(),
            m.age.max(),
            m.age.min(),
        ]))
        .from(MEMBER)
        .build()
        .unwrap();

    let row = QueryExecutor::new(&source).fetch_one(&select).unwrap();
    assert_eq!(row.get_as::<i64>(0usize).unwrap(), 4);
    assert_eq!(row.get_as::<i64>(1usize).unwrap(), 100);
    assert_eq!(row.get_as::<f64>(2usize).unwrap(), 25.0);
    assert_eq!(row.get_as::<i64>(3usize).unwrap(), 40);
    assert_eq!(row.get_as::<i64>(4usize).unwrap(), 10);
    assert_eq!(row.get_as::<f64>(&m.age.avg()).unwrap(), 25.0);
}

/// Groups come back in the order their key first appears.
#[test]
fn test_group_average_per_team() {
    let (source, m, team) = setup();
    let select = QueryFactory::new(source.schema())
        .select(Projections::tuple([team.name.expr(), m.age.avg()]))
        .from(MEMBER)
        .join(&m.team)
        .group_by([&team.name])
        .build()
        .unwrap();

    let rows = QueryExecutor::new(&source).fetch(&select).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_as::<String>(&team.name).unwrap(), "teamA");
    assert_eq!(rows[0].get_as::<f64>(1usize).unwrap(), 15.0);
    assert_eq!(rows[1].get_as::<String>(&team.name).unwrap(), "teamB");
    assert_eq!(rows[1].get_as::<f64>(1usize).unwrap(), 35.0);
}

#[test]
fn test_group_order_by_aggregate_descending() {
    let (source, m, team) = setup();
    let select = QueryFactory::new(source.schema())
        .select(Projections::tuple([team.name.expr(), m.age.sum()]))
        .from(MEMBER)
        .join(&m.team)
        .group_by([&team.name])
        .order_by(m.age.sum(), SortDirection::Desc)
        .build()
        .unwrap();

    let rows = QueryExecutor::new(&source).fetch(&select).unwrap();
    let sums: Vec<i64> = rows.iter().map(|r| r.get_as::<i64>(1usize).unwrap()).collect();
    assert_eq!(sums, vec![70, 30]);
}

/// Aggregating nothing still yields one row: a zero count and null extremes.
#[test]
fn test_aggregate_over_empty_input() {
    let source = MemoryDataSource::new(catalog().unwrap());
    let m = QMember::new(source.schema()).unwrap();
    let select = QueryFactory::new(source.schema())
        .select(Projections::tuple([Expr::count_rows(), m.age.max()]))
        .from(MEMBER)
        .build()
        .unwrap();

    let row = QueryExecutor::new(&source).fetch_one(&select).unwrap();
    assert_eq!(row.get(0usize), Some(&Value::Int(0)));
    assert_eq!(row.get(1usize), Some(&Value::Null));
}

#[test]
fn test_ungrouped_field_rejected() {
    let (source, m, team) = setup();
    let err = QueryFactory::new(source.schema())
        .select(Projections::tuple([m.username.expr(), m.age.avg()]))
        .from(MEMBER)
        .join(&m.team)
        .group_by([&team.name])
        .build()
        .unwrap_err();
    assert!(matches!(err, PlannerError::NotGrouped(_)));
}

#[test]
fn test_joined_field_requires_join() {
    let (source, _m, team) = setup();
    let err = QueryFactory::new(source.schema())
        .select(Projections::tuple([&team.name]))
        .from(MEMBER)
        .build()
        .unwrap_err();
    assert!(matches!(err, PlannerError::FieldNotInScope { .. }));
}
