//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroquery run <scenario> [--config <path>]
//! - aeroquery explain <scenario> [--text]
//! - aeroquery list

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::scenarios::Scenario;

/// aeroquery - type-safe composable queries over the member/team sample
#[derive(Parser, Debug)]
#[command(name = "aeroquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scenario against the seeded in-memory source
    Run {
        scenario: Scenario,

        /// Path to configuration file (defaults apply when absent)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the plan of a scenario without running it
    Explain {
        scenario: Scenario,

        /// Plain-text plan instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// List scenarios
    List,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["aeroquery", "run", "dto-constructor-unchecked"]).unwrap();
        match cli.command {
            Command::Run { scenario, config } => {
                assert_eq!(scenario, Scenario::DtoConstructorUnchecked);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_config() {
        let cli =
            Cli::try_parse_from(["aeroquery", "run", "group", "--config", "aeroquery.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Run { scenario: Scenario::Group, config: Some(_) }
        ));
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(Cli::try_parse_from(["aeroquery", "explain", "nope"]).is_err());
    }
}
