//! Operation: execute the task plan of a target.

use std::sync::Arc;

use strata_tasks::executor::{execute_observed, BuildReport, Cancellation, ProcessRunner};
use strata_tasks::state::TaskState;
use strata_util::progress::{progress_bar, status, status_error, status_warn};

use crate::{ops_plan, ProjectContext, TargetSelection};

/// Options for `strata run`.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Tasks to run; empty runs the whole plan.
    pub tasks: Vec<String>,
    /// Overrides the global `[build] jobs`.
    pub jobs: Option<usize>,
}

/// Plan and run. Ctrl-C cancels: unfinished tasks are reported as skipped.
pub async fn run(
    ctx: &ProjectContext,
    selection: &TargetSelection,
    opts: &RunOptions,
) -> miette::Result<BuildReport> {
    let plan = ops_plan::plan(ctx, selection, &opts.tasks)?;
    let jobs = opts.jobs.unwrap_or(ctx.global.build.jobs as usize).max(1);
    status("Running", &format!("{} task(s) with {jobs} job(s)", plan.len()));

    let (handle, cancel) = Cancellation::new();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let pb = progress_bar(plan.len() as u64, "Executing");
    let report = execute_observed(&plan, Arc::new(ProcessRunner), jobs, cancel, |name, state| {
        pb.inc(1);
        pb.set_message(format!("{name} {state}"));
    })
    .await;
    pb.finish_and_clear();
    watcher.abort();

    for outcome in &report.tasks {
        match outcome.state {
            TaskState::Completed => status("Finished", &outcome.name),
            TaskState::Failed => status_error(
                "Failed",
                &format!(
                    "{}: {}",
                    outcome.name,
                    outcome.error.as_deref().unwrap_or("unknown error")
                ),
            ),
            _ => status_warn("Skipped", &outcome.name),
        }
    }
    Ok(report)
}
