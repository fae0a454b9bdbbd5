//! Dynamic member search
//!
//! Two equivalent ways to combine optional conditions: an accumulating
//! `PredicateBuilder`, and one optional predicate per parameter handed to
//! `filter_all`. An absent parameter never constrains the result.

use crate::planner::{PlannerResult, Predicate, PredicateBuilder, QueryFactory, Select};
use crate::schema::SchemaResult;

use super::dto::Member;
use super::{QMember, MEMBER};

/// Members matching the given username and age, built with a `PredicateBuilder`
pub fn search_members(
    factory: &QueryFactory<'_>,
    member: &QMember,
    username: Option<&str>,
    age: Option<i64>,
) -> PlannerResult<Select<Member>> {
    let mut builder = PredicateBuilder::new();
    builder
        .eq_if_present(&member.username, username)?
        .eq_if_present(&member.age, age)?;

    factory
        .select_entity::<Member>(MEMBER)
        .filter(builder.build())
        .build()
}

/// Same search with one optional predicate per parameter
pub fn search_members_where(
    factory: &QueryFactory<'_>,
    member: &QMember,
    username: Option<&str>,
    age: Option<i64>,
) -> PlannerResult<Select<Member>> {
    factory
        .select_entity::<Member>(MEMBER)
        .filter_all([username_eq(member, username)?, age_eq(member, age)?])
        .build()
}

pub fn username_eq(member: &QMember, username: Option<&str>) -> SchemaResult<Option<Predicate>> {
    username.map(|u| member.username.eq(u)).transpose()
}

pub fn age_eq(member: &QMember, age: Option<i64>) -> SchemaResult<Option<Predicate>> {
    age.map(|a| member.age.eq(a)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::QueryExecutor;
    use crate::sample::seeded_source;
    use crate::executor::DataSource;

    #[test]
    fn test_both_styles_agree() {
        let source = seeded_source().unwrap();
        let factory = QueryFactory::new(source.schema());
        let member = QMember::new(source.schema()).unwrap();
        let executor = QueryExecutor::new(&source);

        let cases = [
            (None, None, 4),
            (Some("member1"), None, 1),
            (None, Some(30), 1),
            (Some("member1"), Some(10), 1),
            (Some("member1"), Some(20), 0),
        ];
        for (username, age, expected) in cases {
            let built = executor
                .fetch(&search_members(&factory, &member, username, age).unwrap())
                .unwrap();
            let params = executor
                .fetch(&search_members_where(&factory, &member, username, age).unwrap())
                .unwrap();
            assert_eq!(built.len(), expected);
            assert_eq!(built, params);
        }
    }

    #[test]
    fn test_absent_parameters_leave_no_filter() {
        let source = seeded_source().unwrap();
        let factory = QueryFactory::new(source.schema());
        let member = QMember::new(source.schema()).unwrap();

        let select = search_members(&factory, &member, None, None).unwrap();
        assert!(select.plan().filter().map_or(true, Predicate::is_always));
    }
}
