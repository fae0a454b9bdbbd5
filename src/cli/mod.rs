//! CLI module for aeroquery
//!
//! Provides command-line interface for:
//! - run: Execute a tutorial scenario against seeded sample data
//! - explain: Describe a scenario's plan without executing it
//! - list: Name every scenario

mod args;
mod commands;
mod errors;
mod io;
mod scenarios;

pub use args::{Cli, Command};
pub use commands::{explain, list, run, run_command, run_scenario};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response, write_text};
pub use scenarios::{Scenario, Workbench, NON_MEMBER};
