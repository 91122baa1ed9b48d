use miette::Result;

use strata_ops::{ops_config, ProjectContext, TargetSelection};

pub fn exec(ctx: &ProjectContext, selection: &TargetSelection, json: bool) -> Result<()> {
    let config = ops_config::config(ctx, selection)?;
    if json {
        println!("{}", ops_config::to_json(&config)?);
    } else {
        print!("{}", ops_config::render(&config));
    }
    Ok(())
}
