use miette::Result;

use strata_ops::{ops_plan, ProjectContext, TargetSelection};

pub fn exec(ctx: &ProjectContext, selection: &TargetSelection, tasks: &[String], json: bool) -> Result<()> {
    let plan = ops_plan::plan(ctx, selection, tasks)?;
    if json {
        super::print_json(&plan)
    } else {
        print!("{}", ops_plan::render(&plan));
        Ok(())
    }
}
