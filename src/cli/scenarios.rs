//! Tutorial scenarios over the member/team sample
//!
//! Each scenario builds its plan against a freshly seeded in-memory source,
//! so scenarios never observe each other's bulk writes.

use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::{json, Value as Json};

use crate::cache::PersistenceContext;
use crate::executor::{DataSource, ExecutorConfig, QueryExecutor};
use crate::memory::MemoryDataSource;
use crate::observability::MetricsRegistry;
use crate::planner::{Expr, PlanKind, PlannerResult, QueryFactory, QueryPlan, Select, SortDirection};
use crate::projection::{Projections, Tuple};
use crate::sample::{
    search_members, search_members_where, seeded_source, Member, MemberDto, QMember, QTeam,
    UserDto, MEMBER,
};

use super::errors::CliResult;

/// Username given to members hit by the bulk update
pub const NON_MEMBER: &str = "non-member";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    Start,
    Search,
    Aggregation,
    Group,
    SimpleProjection,
    DtoBean,
    DtoField,
    DtoConstructor,
    DtoConstructorUnchecked,
    UserDtoSubquery,
    DynamicBuilder,
    DynamicWhereParams,
    BulkUpdate,
    BulkAdd,
    BulkDelete,
    SqlFunction,
    SqlFunctionLower,
}

impl Scenario {
    pub const ALL: [Scenario; 17] = [
        Scenario::Start,
        Scenario::Search,
        Scenario::Aggregation,
        Scenario::Group,
        Scenario::SimpleProjection,
        Scenario::DtoBean,
        Scenario::DtoField,
        Scenario::DtoConstructor,
        Scenario::DtoConstructorUnchecked,
        Scenario::UserDtoSubquery,
        Scenario::DynamicBuilder,
        Scenario::DynamicWhereParams,
        Scenario::BulkUpdate,
        Scenario::BulkAdd,
        Scenario::BulkDelete,
        Scenario::SqlFunction,
        Scenario::SqlFunctionLower,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Start => "start",
            Scenario::Search => "search",
            Scenario::Aggregation => "aggregation",
            Scenario::Group => "group",
            Scenario::SimpleProjection => "simple-projection",
            Scenario::DtoBean => "dto-bean",
            Scenario::DtoField => "dto-field",
            Scenario::DtoConstructor => "dto-constructor",
            Scenario::DtoConstructorUnchecked => "dto-constructor-unchecked",
            Scenario::UserDtoSubquery => "user-dto-subquery",
            Scenario::DynamicBuilder => "dynamic-builder",
            Scenario::DynamicWhereParams => "dynamic-where-params",
            Scenario::BulkUpdate => "bulk-update",
            Scenario::BulkAdd => "bulk-add",
            Scenario::BulkDelete => "bulk-delete",
            Scenario::SqlFunction => "sql-function",
            Scenario::SqlFunctionLower => "sql-function-lower",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::Start => "fetch exactly one member by username",
            Scenario::Search => "fetch one member by username and age",
            Scenario::Aggregation => "count, sum, avg, max and min of ages",
            Scenario::Group => "average age per team over an inner join",
            Scenario::SimpleProjection => "username and age as tuples",
            Scenario::DtoBean => "MemberDto populated through setters",
            Scenario::DtoField => "MemberDto populated field by field",
            Scenario::DtoConstructor => "MemberDto through a type-checked constructor",
            Scenario::DtoConstructorUnchecked => "MemberDto through a positional constructor",
            Scenario::UserDtoSubquery => "UserDto with a scalar sub-query aliased as age",
            Scenario::DynamicBuilder => "optional conditions combined by a predicate builder",
            Scenario::DynamicWhereParams => "optional conditions as separate where parameters",
            Scenario::BulkUpdate => "rename members younger than 28",
            Scenario::BulkAdd => "double every age",
            Scenario::BulkDelete => "delete members older than 18",
            Scenario::SqlFunction => "replace 'member' with 'M' in usernames",
            Scenario::SqlFunctionLower => "usernames equal to their lower-case form",
        }
    }

    /// The scenario's main plan
    pub fn plan(&self, bench: &Workbench) -> CliResult<QueryPlan> {
        let plan = match self {
            Scenario::Start => member1(bench)?.plan().clone(),
            Scenario::Search => member1_aged_10(bench)?.plan().clone(),
            Scenario::Aggregation => age_statistics(bench)?.plan().clone(),
            Scenario::Group => team_average_age(bench)?.plan().clone(),
            Scenario::SimpleProjection => usernames_and_ages(bench)?.plan().clone(),
            Scenario::DtoBean => dto_bean(bench)?.plan().clone(),
            Scenario::DtoField => dto_field(bench)?.plan().clone(),
            Scenario::DtoConstructor => dto_constructor(bench)?.plan().clone(),
            Scenario::DtoConstructorUnchecked => dto_constructor_unchecked(bench)?.plan().clone(),
            Scenario::UserDtoSubquery => user_dto(bench)?.plan().clone(),
            Scenario::DynamicBuilder => dynamic_builder(bench)?.plan().clone(),
            Scenario::DynamicWhereParams => dynamic_where_params(bench)?.plan().clone(),
            Scenario::BulkUpdate => rename_young_members(bench)?,
            Scenario::BulkAdd => double_ages(bench)?,
            Scenario::BulkDelete => delete_adults(bench)?,
            Scenario::SqlFunction => replaced_usernames(bench)?.plan().clone(),
            Scenario::SqlFunctionLower => lower_case_usernames(bench)?.plan().clone(),
        };
        Ok(plan)
    }

    /// Runs the scenario and returns its result as JSON
    pub fn run(&self, bench: &Workbench) -> CliResult<Json> {
        let executor = bench.executor();
        let result = match self {
            Scenario::Start => to_json(&executor.fetch_one(&member1(bench)?)?)?,
            Scenario::Search => to_json(&executor.fetch_one(&member1_aged_10(bench)?)?)?,
            Scenario::Aggregation => tuples(executor.fetch(&age_statistics(bench)?)?),
            Scenario::Group => tuples(executor.fetch(&team_average_age(bench)?)?),
            Scenario::SimpleProjection => tuples(executor.fetch(&usernames_and_ages(bench)?)?),
            Scenario::DtoBean => to_json(&executor.fetch(&dto_bean(bench)?)?)?,
            Scenario::DtoField => to_json(&executor.fetch(&dto_field(bench)?)?)?,
            Scenario::DtoConstructor => to_json(&executor.fetch(&dto_constructor(bench)?)?)?,
            Scenario::DtoConstructorUnchecked => {
                to_json(&executor.fetch(&dto_constructor_unchecked(bench)?)?)?
            }
            Scenario::UserDtoSubquery => to_json(&executor.fetch(&user_dto(bench)?)?)?,
            Scenario::DynamicBuilder => to_json(&executor.fetch(&dynamic_builder(bench)?)?)?,
            Scenario::DynamicWhereParams => {
                to_json(&executor.fetch(&dynamic_where_params(bench)?)?)?
            }
            Scenario::BulkUpdate => bulk(bench, rename_young_members(bench)?)?,
            Scenario::BulkAdd => bulk(bench, double_ages(bench)?)?,
            Scenario::BulkDelete => bulk(bench, delete_adults(bench)?)?,
            Scenario::SqlFunction => to_json(&executor.fetch(&replaced_usernames(bench)?)?)?,
            Scenario::SqlFunctionLower => {
                to_json(&executor.fetch(&lower_case_usernames(bench)?)?)?
            }
        };

        Ok(json!({
            "scenario": self.name(),
            "result": result,
            "metrics": bench.metrics().to_json(),
        }))
    }
}

/// Seeded source plus the handles and settings a scenario runs with
pub struct Workbench {
    source: Arc<MemoryDataSource>,
    member: QMember,
    team: QTeam,
    config: ExecutorConfig,
    metrics: Arc<MetricsRegistry>,
}

impl Workbench {
    pub fn new(config: ExecutorConfig) -> CliResult<Self> {
        let source = Arc::new(seeded_source()?);
        let member = QMember::new(source.schema())?;
        let team = QTeam::new(source.schema())?;
        Ok(Self {
            source,
            member,
            team,
            config,
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    pub fn source(&self) -> &Arc<MemoryDataSource> {
        &self.source
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn factory(&self) -> QueryFactory<'_> {
        QueryFactory::new(self.source.schema()).with_metrics(Arc::clone(&self.metrics))
    }

    pub fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(self.source.as_ref())
            .with_config(self.config.clone())
            .with_metrics(Arc::clone(&self.metrics))
    }
}

fn member1(bench: &Workbench) -> PlannerResult<Select<Member>> {
    bench
        .factory()
        .select_entity::<Member>(MEMBER)
        .filter(bench.member.username.eq("member1")?)
        .build()
}

fn member1_aged_10(bench: &Workbench) -> PlannerResult<Select<Member>> {
    let m = &bench.member;
    bench
        .factory()
        .select_entity::<Member>(MEMBER)
        .filter(m.username.eq("member1")?.and(m.age.eq(10)?))
        .build()
}

fn age_statistics(bench: &Workbench) -> PlannerResult<Select<Tuple>> {
    let age = &bench.member.age;
    bench
        .factory()
        .select(Projections::tuple([
            Expr::count_rows(),
            age.sum(),
            age.avg(),
            age.max(),
            age.min(),
        ]))
        .from(MEMBER)
        .build()
}

fn team_average_age(bench: &Workbench) -> PlannerResult<Select<Tuple>> {
    bench
        .factory()
        .select(Projections::tuple([bench.team.name.expr(), bench.member.age.avg()]))
        .from(MEMBER)
        .join(&bench.member.team)
        .group_by([&bench.team.name])
        .build()
}

fn usernames_and_ages(bench: &Workbench) -> PlannerResult<Select<Tuple>> {
    bench
        .factory()
        .select(Projections::tuple([&bench.member.username, &bench.member.age]))
        .from(MEMBER)
        .build()
}

fn dto_bean(bench: &Workbench) -> PlannerResult<Select<MemberDto>> {
    bench
        .factory()
        .select(Projections::bean::<MemberDto>([&bench.member.username, &bench.member.age]))
        .from(MEMBER)
        .build()
}

fn dto_field(bench: &Workbench) -> PlannerResult<Select<MemberDto>> {
    bench
        .factory()
        .select(Projections::fields::<MemberDto>([&bench.member.username, &bench.member.age]))
        .from(MEMBER)
        .build()
}

fn dto_constructor(bench: &Workbench) -> PlannerResult<Select<MemberDto>> {
    bench
        .factory()
        .select(Projections::constructor::<MemberDto>([&bench.member.username, &bench.member.age]))
        .from(MEMBER)
        .build()
}

fn dto_constructor_unchecked(bench: &Workbench) -> PlannerResult<Select<MemberDto>> {
    bench
        .factory()
        .select(Projections::constructor_unchecked::<MemberDto>([
            &bench.member.username,
            &bench.member.age,
        ]))
        .from(MEMBER)
        .build()
}

fn user_dto(bench: &Workbench) -> PlannerResult<Select<UserDto>> {
    let factory = bench.factory();
    let oldest = factory
        .select(Projections::tuple([bench.member.age.max()]))
        .from(MEMBER)
        .build()?
        .into_subquery();

    factory
        .select(Projections::fields::<UserDto>([
            bench.member.username.as_column("name"),
            oldest.as_column("age"),
        ]))
        .from(MEMBER)
        .build()
}

fn dynamic_builder(bench: &Workbench) -> PlannerResult<Select<Member>> {
    search_members(&bench.factory(), &bench.member, Some("member1"), Some(10))
}

fn dynamic_where_params(bench: &Workbench) -> PlannerResult<Select<Member>> {
    search_members_where(&bench.factory(), &bench.member, Some("member1"), Some(10))
}

fn rename_young_members(bench: &Workbench) -> PlannerResult<QueryPlan> {
    bench
        .factory()
        .update(MEMBER)
        .set(&bench.member.username, NON_MEMBER)
        .filter(bench.member.age.lt(28)?)
        .build()
}

fn double_ages(bench: &Workbench) -> PlannerResult<QueryPlan> {
    bench
        .factory()
        .update(MEMBER)
        .set(&bench.member.age, bench.member.age.mul(2))
        .build()
}

fn delete_adults(bench: &Workbench) -> PlannerResult<QueryPlan> {
    bench
        .factory()
        .delete(MEMBER)
        .filter(bench.member.age.gt(18)?)
        .build()
}

fn replaced_usernames(bench: &Workbench) -> PlannerResult<Select<String>> {
    bench
        .factory()
        .select(Projections::scalar::<String>(bench.member.username.replace("member", "M")))
        .from(MEMBER)
        .build()
}

fn lower_case_usernames(bench: &Workbench) -> PlannerResult<Select<String>> {
    let username = &bench.member.username;
    bench
        .factory()
        .select(Projections::scalar::<String>(username))
        .from(MEMBER)
        .filter(username.eq_expr(username.lower())?)
        .build()
}

/// Runs a bulk write with an entity cache registered.
///
/// member1 is materialized before the write; because the executor
/// invalidates the cache, the second lookup reloads it from the source.
fn bulk(bench: &Workbench, plan: QueryPlan) -> CliResult<Json> {
    let cache = Arc::new(PersistenceContext::new(bench.source.clone()));
    let mut executor = bench.executor();
    executor.register_cache(cache.clone());

    let before = cache.find(MEMBER, 1)?;
    let result = match plan.kind() {
        PlanKind::Delete => executor.execute_delete(&plan)?,
        _ => executor.execute_update(&plan)?,
    };
    let after = cache.find(MEMBER, 1)?;

    let remaining = bench
        .factory()
        .select_entity::<Member>(MEMBER)
        .order_by(&bench.member.id, SortDirection::Asc)
        .build()?;
    let members = executor.fetch(&remaining)?;

    Ok(json!({
        "affected": result.affected,
        "invalidation_required": result.invalidation_required,
        "member1_before": before.map(|t| t.to_json()),
        "member1_after": after.map(|t| t.to_json()),
        "members": to_json(&members)?,
    }))
}

fn tuples(rows: Vec<Tuple>) -> Json {
    Json::Array(rows.iter().map(Tuple::to_json).collect())
}

fn to_json<T: Serialize>(value: &T) -> CliResult<Json> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_parseable() {
        let mut names: Vec<&str> = Scenario::ALL.iter().map(Scenario::name).collect();
        for name in &names {
            assert!(Scenario::from_str(name, false).is_ok(), "{}", name);
        }
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Scenario::ALL.len());
    }

    #[test]
    fn test_every_plan_builds() {
        let bench = Workbench::new(ExecutorConfig::default()).unwrap();
        for scenario in Scenario::ALL {
            assert!(scenario.plan(&bench).is_ok(), "{}", scenario.name());
        }
    }

    #[test]
    fn test_sql_function() {
        let bench = Workbench::new(ExecutorConfig::default()).unwrap();
        let output = Scenario::SqlFunction.run(&bench).unwrap();
        assert_eq!(output["result"], json!(["M1", "M2", "M3", "M4"]));
    }

    #[test]
    fn test_bulk_update_refreshes_cache() {
        let bench = Workbench::new(ExecutorConfig::default()).unwrap();
        let output = Scenario::BulkUpdate.run(&bench).unwrap();
        let result = &output["result"];
        assert_eq!(result["affected"], json!(2));
        assert_eq!(result["member1_before"]["username"], json!("member1"));
        assert_eq!(result["member1_after"]["username"], json!(NON_MEMBER));
    }
}
