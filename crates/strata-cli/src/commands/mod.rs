//! Command dispatch and handler modules.

mod clean;
mod config;
mod deps;
mod explain;
mod plan;
mod run;

use miette::Result;
use std::path::PathBuf;

use strata_ops::{ProjectContext, TargetSelection};
use strata_util::errors::StrataError;

use crate::cli::{Cli, Command, TargetArgs};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let ctx = load_context(cli.manifest_path)?;
    match cli.command {
        Command::Config { target, json } => config::exec(&ctx, &selection(target), json),
        Command::Explain {
            option,
            target,
            json,
        } => explain::exec(&ctx, &selection(target), &option, json),
        Command::Deps {
            target,
            conflicts,
            json,
        } => deps::exec(&ctx, &selection(target), conflicts, json),
        Command::Plan {
            tasks,
            target,
            json,
        } => plan::exec(&ctx, &selection(target), &tasks, json),
        Command::Run {
            tasks,
            target,
            jobs,
        } => run::exec(&ctx, &selection(target), tasks, jobs).await,
        Command::Clean => clean::exec(&ctx),
    }
}

fn load_context(manifest_path: Option<PathBuf>) -> Result<ProjectContext> {
    let path = match manifest_path {
        Some(path) => path,
        None => {
            let cwd = std::env::current_dir().map_err(StrataError::Io)?;
            ProjectContext::discover(&cwd)?
        }
    };
    ProjectContext::load(&path)
}

fn selection(args: TargetArgs) -> TargetSelection {
    TargetSelection {
        module: args.module,
        variant: args.variant,
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| StrataError::Generic {
        message: format!("Failed to serialize output: {e}"),
    })?;
    println!("{text}");
    Ok(())
}
