//! Bulk Mutation Tests
//!
//! Bulk writes go straight to the source. Registered caches are invalidated
//! by the executor; unregistered copies stay stale until evicted.

use std::sync::Arc;

use aeroquery::cache::PersistenceContext;
use aeroquery::executor::{DataSource, ExecutorError, QueryExecutor};
use aeroquery::memory::MemoryDataSource;
use aeroquery::observability::MetricsRegistry;
use aeroquery::planner::QueryFactory;
use aeroquery::sample::{seeded_source, QMember, MEMBER};
use aeroquery::schema::Value;

fn setup() -> (Arc<MemoryDataSource>, QMember) {
    let source = Arc::new(seeded_source().unwrap());
    let member = QMember::new(source.schema()).unwrap();
    (source, member)
}

fn ages(source: &MemoryDataSource) -> Vec<Value> {
    source
        .rows(MEMBER)
        .unwrap()
        .into_iter()
        .map(|row| row[2].clone())
        .collect()
}

/// age < 28 touches exactly two members, and a registered cache re-reads.
#[test]
fn test_update_invalidates_registered_cache() {
    let (source, m) = setup();
    let cache = Arc::new(PersistenceContext::new(source.clone()));
    let metrics = Arc::new(MetricsRegistry::new());
    let mut executor = QueryExecutor::new(source.as_ref()).with_metrics(metrics.clone());
    executor.register_cache(cache.clone());

    let before = cache.find(MEMBER, 1).unwrap().unwrap();
    assert_eq!(before.get_as::<String>("username").unwrap(), "member1");

    let plan = QueryFactory::new(source.schema())
        .update(MEMBER)
        .set(&m.username, "non-member")
        .filter(m.age.lt(28).unwrap())
        .build()
        .unwrap();
    let result = executor.execute_update(&plan).unwrap();
    assert_eq!(result.affected, 2);
    assert!(result.invalidation_required);
    assert!(!cache.contains(MEMBER, 1));

    let after = cache.find(MEMBER, 1).unwrap().unwrap();
    assert_eq!(after.get_as::<String>("username").unwrap(), "non-member");
    assert_eq!(metrics.snapshot().cache_invalidations, 1);
}

/// Without registration the cached copy is stale until evicted.
#[test]
fn test_unregistered_cache_stays_stale() {
    let (source, m) = setup();
    let cache = PersistenceContext::new(source.clone());
    let executor = QueryExecutor::new(source.as_ref());

    cache.find(MEMBER, 1).unwrap();
    let plan = QueryFactory::new(source.schema())
        .update(MEMBER)
        .set(&m.username, "renamed")
        .build()
        .unwrap();
    executor.execute_update(&plan).unwrap();

    let stale = cache.find(MEMBER, 1).unwrap().unwrap();
    assert_eq!(stale.get_as::<String>("username").unwrap(), "member1");

    cache.evict_entity(MEMBER);
    let fresh = cache.find(MEMBER, 1).unwrap().unwrap();
    assert_eq!(fresh.get_as::<String>("username").unwrap(), "renamed");
}

#[test]
fn test_arithmetic_update_reads_pre_update_row() {
    let (source, m) = setup();
    let plan = QueryFactory::new(source.schema())
        .update(MEMBER)
        .set(&m.age, m.age.mul(2))
        .build()
        .unwrap();

    let result = QueryExecutor::new(source.as_ref()).execute_update(&plan).unwrap();
    assert_eq!(result.affected, 4);
    assert_eq!(
        ages(&source),
        vec![Value::Int(20), Value::Int(40), Value::Int(60), Value::Int(80)]
    );
}

#[test]
fn test_delete_older_than_18() {
    let (source, m) = setup();
    let plan = QueryFactory::new(source.schema())
        .delete(MEMBER)
        .filter(m.age.gt(18).unwrap())
        .build()
        .unwrap();

    let result = QueryExecutor::new(source.as_ref()).execute_delete(&plan).unwrap();
    assert_eq!(result.affected, 3);
    assert_eq!(ages(&source), vec![Value::Int(10)]);
}

/// Nothing matched means nothing to invalidate.
#[test]
fn test_no_match_leaves_cache_alone() {
    let (source, m) = setup();
    let cache = Arc::new(PersistenceContext::new(source.clone()));
    let mut executor = QueryExecutor::new(source.as_ref());
    executor.register_cache(cache.clone());

    cache.find(MEMBER, 2).unwrap();
    let plan = QueryFactory::new(source.schema())
        .delete(MEMBER)
        .filter(m.age.gt(100).unwrap())
        .build()
        .unwrap();
    let result = executor.execute_delete(&plan).unwrap();
    assert_eq!(result.affected, 0);
    assert!(!result.invalidation_required);
    assert!(cache.contains(MEMBER, 2));
}

#[test]
fn test_plan_kind_is_enforced() {
    let (source, m) = setup();
    let executor = QueryExecutor::new(source.as_ref());
    let delete = QueryFactory::new(source.schema())
        .delete(MEMBER)
        .filter(m.id.eq(1).unwrap())
        .build()
        .unwrap();

    let err = executor.execute_update(&delete).unwrap_err();
    assert!(matches!(err, ExecutorError::WrongPlanKind { .. }));
    assert_eq!(source.row_count(MEMBER).unwrap(), 4);
}

#[test]
fn test_update_value_type_checked_at_build() {
    let (source, m) = setup();
    let err = QueryFactory::new(source.schema())
        .update(MEMBER)
        .set(&m.age, "old")
        .build()
        .unwrap_err();
    assert_eq!(err.root_code(), "AERO_SCHEMA_MISMATCH");
}
