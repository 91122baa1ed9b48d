//! Handler for `strata run`.

use miette::Result;

use strata_ops::ops_run::{self, RunOptions};
use strata_ops::{ProjectContext, TargetSelection};
use strata_util::errors::StrataError;
use strata_util::progress::status;

pub async fn exec(
    ctx: &ProjectContext,
    selection: &TargetSelection,
    tasks: Vec<String>,
    jobs: Option<usize>,
) -> Result<()> {
    let report = ops_run::run(ctx, selection, &RunOptions { tasks, jobs }).await?;
    if report.success() {
        status("Done", &report.to_string());
        Ok(())
    } else {
        Err(StrataError::Task {
            message: format!("build did not complete: {report}"),
        }
        .into())
    }
}
