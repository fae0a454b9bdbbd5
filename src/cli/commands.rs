//! CLI command implementations
//!
//! Every command seeds its own in-memory source, so runs are independent
//! and deterministic. Results go to stdout as one JSON object; logs go to
//! stderr.

use std::path::Path;

use serde_json::{json, Value};

use crate::config::AeroQueryConfig;
use crate::executor::ExecutorConfig;
use crate::observability::Logger;
use crate::planner::ExplainPlan;

use super::args::Command;
use super::errors::CliResult;
use super::io::{write_error, write_response, write_text};
use super::scenarios::{Scenario, Workbench};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Run { scenario, config } => run_scenario(scenario, config.as_deref()),
        Command::Explain { scenario, text } => explain(scenario, text),
        Command::List => list(),
    }
}

/// Run one scenario and write its result
///
/// A failing scenario is reported on stdout as an error object and then
/// returned, so the process still exits non-zero.
pub fn run_scenario(scenario: Scenario, config_path: Option<&Path>) -> CliResult<()> {
    let config = AeroQueryConfig::load_or_default(config_path)?;
    config.apply_log_level()?;

    match execute(scenario, config.to_executor_config()) {
        Ok(output) => write_response(output),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

fn execute(scenario: Scenario, config: ExecutorConfig) -> CliResult<Value> {
    let bench = Workbench::new(config)?;
    let scenario_name = scenario.name();
    Logger::info("SCENARIO_STARTED", &[("scenario", scenario_name)]);
    let output = scenario.run(&bench)?;
    Logger::info("SCENARIO_COMPLETED", &[("scenario", scenario_name)]);
    Ok(output)
}

/// Describe a scenario's plan without executing it
pub fn explain(scenario: Scenario, text: bool) -> CliResult<()> {
    let bench = Workbench::new(ExecutorConfig::default())?;
    let explain = match scenario.plan(&bench) {
        Ok(plan) => ExplainPlan::from_plan(&plan),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            return Err(e);
        }
    };

    if text {
        write_text(&format!("{}\n", explain))
    } else {
        write_response(json!({
            "scenario": scenario.name(),
            "explain": serde_json::to_value(&explain)?,
        }))
    }
}

/// List every scenario with a one-line description
pub fn list() -> CliResult<()> {
    let scenarios: Vec<Value> = Scenario::ALL
        .iter()
        .map(|s| json!({ "name": s.name(), "description": s.description() }))
        .collect();
    write_response(Value::Array(scenarios))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_fails_on_row_cap() {
        let config = ExecutorConfig {
            max_rows: Some(1),
            ..ExecutorConfig::default()
        };
        let err = execute(Scenario::SimpleProjection, config).unwrap_err();
        assert_eq!(err.code_str(), "AERO_CLI_EXECUTION_FAILED");
    }

    #[test]
    fn test_execute_reports_scenario() {
        let output = execute(Scenario::Group, ExecutorConfig::default()).unwrap();
        assert_eq!(output["scenario"], json!("group"));
        assert_eq!(output["result"].as_array().map(Vec::len), Some(2));
    }
}
