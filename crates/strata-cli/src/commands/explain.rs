use miette::Result;

use strata_ops::{ops_explain, ProjectContext, TargetSelection};

pub fn exec(ctx: &ProjectContext, selection: &TargetSelection, option: &str, json: bool) -> Result<()> {
    let explanation = ops_explain::explain(ctx, selection, option)?;
    if json {
        super::print_json(&explanation)
    } else {
        print!("{}", ops_explain::render(&explanation));
        Ok(())
    }
}
