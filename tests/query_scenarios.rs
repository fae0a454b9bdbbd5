//! Scenario Tests
//!
//! Runs the tutorial scenarios end to end through the CLI layer and checks
//! their JSON output against the seed data.

use aeroquery::cli::{Scenario, Workbench, NON_MEMBER};
use aeroquery::executor::ExecutorConfig;
use aeroquery::planner::ExplainPlan;
use serde_json::{json, Value};

fn run(scenario: Scenario) -> Value {
    let bench = Workbench::new(ExecutorConfig::default()).unwrap();
    let output = scenario.run(&bench).unwrap();
    assert_eq!(output["scenario"], json!(scenario.name()));
    output["result"].clone()
}

fn member_dtos() -> Value {
    json!([
        { "username": "member1", "age": 10 },
        { "username": "member2", "age": 20 },
        { "username": "member3", "age": 30 },
        { "username": "member4", "age": 40 },
    ])
}

#[test]
fn test_start_and_search() {
    let expected = json!({ "id": 1, "username": "member1", "age": 10, "team_id": 1 });
    assert_eq!(run(Scenario::Start), expected);
    assert_eq!(run(Scenario::Search), expected);
}

#[test]
fn test_dynamic_scenarios_agree() {
    let built = run(Scenario::DynamicBuilder);
    assert_eq!(built.as_array().map(Vec::len), Some(1));
    assert_eq!(built, run(Scenario::DynamicWhereParams));
}

#[test]
fn test_dto_scenarios_agree() {
    for scenario in [
        Scenario::DtoBean,
        Scenario::DtoField,
        Scenario::DtoConstructor,
        Scenario::DtoConstructorUnchecked,
    ] {
        assert_eq!(run(scenario), member_dtos(), "{}", scenario.name());
    }

    let tuples = run(Scenario::SimpleProjection);
    assert_eq!(tuples, member_dtos());
}

#[test]
fn test_user_dto_subquery() {
    let users = run(Scenario::UserDtoSubquery);
    assert_eq!(users[0], json!({ "name": "member1", "age": 40 }));
    assert_eq!(users[3], json!({ "name": "member4", "age": 40 }));
}

#[test]
fn test_aggregation_and_group() {
    let stats = run(Scenario::Aggregation);
    let row = stats[0].as_object().unwrap();
    let values: Vec<&Value> = row.values().collect();
    assert!(values.contains(&&json!(4)));
    assert!(values.contains(&&json!(100)));
    assert!(values.contains(&&json!(25.0)));

    let groups = run(Scenario::Group);
    assert_eq!(groups[0]["name"], json!("teamA"));
    assert_eq!(groups[0]["avg(member.age)"], json!(15.0));
    assert_eq!(groups[1]["name"], json!("teamB"));
    assert_eq!(groups[1]["avg(member.age)"], json!(35.0));
}

#[test]
fn test_bulk_scenarios() {
    let update = run(Scenario::BulkUpdate);
    assert_eq!(update["affected"], json!(2));
    assert_eq!(update["member1_after"]["username"], json!(NON_MEMBER));
    assert_eq!(update["members"][2]["username"], json!("member3"));

    let add = run(Scenario::BulkAdd);
    assert_eq!(add["affected"], json!(4));
    assert_eq!(add["member1_before"]["age"], json!(10));
    assert_eq!(add["member1_after"]["age"], json!(20));

    let delete = run(Scenario::BulkDelete);
    assert_eq!(delete["affected"], json!(3));
    assert_eq!(delete["members"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_sql_function_scenarios() {
    assert_eq!(run(Scenario::SqlFunction), json!(["M1", "M2", "M3", "M4"]));
    assert_eq!(
        run(Scenario::SqlFunctionLower),
        json!(["member1", "member2", "member3", "member4"])
    );
}

#[test]
fn test_explain_group_plan() {
    let bench = Workbench::new(ExecutorConfig::default()).unwrap();
    let plan = Scenario::Group.plan(&bench).unwrap();
    let explain = ExplainPlan::from_plan(&plan);
    assert!(explain.accepted);
    assert_eq!(explain.joins.len(), 1);
    assert_eq!(explain.group_by.len(), 1);
    assert_eq!(explain, ExplainPlan::from_plan(&plan));
}

#[test]
fn test_each_scenario_uses_fresh_data() {
    let bench = Workbench::new(ExecutorConfig::default()).unwrap();
    Scenario::BulkDelete.run(&bench).unwrap();
    assert_eq!(run(Scenario::DtoBean), member_dtos());
}
