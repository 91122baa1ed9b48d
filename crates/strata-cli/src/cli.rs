//! CLI argument definitions for Strata.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "strata",
    version,
    about = "Resolve layered build definitions",
    long_about = "Strata merges layered configuration fragments into one effective \
                  configuration per build target, reconciles dependency versions, and \
                  plans and runs build tasks in dependency order."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to Strata.toml (default: search the current and parent directories)
    #[arg(long, global = true, env = "STRATA_MANIFEST")]
    pub manifest_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Selects the build target.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Module to resolve
    #[arg(short, long)]
    pub module: Option<String>,
    /// Variant of the module
    #[arg(long)]
    pub variant: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective configuration of a target
    Config {
        #[command(flatten)]
        target: TargetArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show which fragments supplied an option
    Explain {
        /// Dotted option path, e.g. minifyEnabled
        option: String,
        #[command(flatten)]
        target: TargetArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the reconciled dependency versions
    Deps {
        #[command(flatten)]
        target: TargetArgs,
        /// Show libraries requested at differing versions
        #[arg(long)]
        conflicts: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the ordered task plan
    Plan {
        /// Only plan what these tasks need
        tasks: Vec<String>,
        #[command(flatten)]
        target: TargetArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Execute the task plan
    Run {
        /// Only run these tasks and what they need
        tasks: Vec<String>,
        #[command(flatten)]
        target: TargetArgs,
        /// Maximum number of tasks running at once
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Remove the project build directory
    Clean,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_tasks_and_jobs() {
        let cli = Cli::parse_from(["strata", "run", "package", "-j", "3", "--variant", "release"]);
        match cli.command {
            Command::Run { tasks, target, jobs } => {
                assert_eq!(tasks, vec!["package"]);
                assert_eq!(jobs, Some(3));
                assert_eq!(target.variant.as_deref(), Some("release"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
