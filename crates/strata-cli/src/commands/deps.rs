//! Handler for `strata deps`.

use miette::Result;

use strata_ops::{ops_deps, ProjectContext, TargetSelection};

pub fn exec(ctx: &ProjectContext, selection: &TargetSelection, conflicts: bool, json: bool) -> Result<()> {
    let resolution = ops_deps::deps(ctx, selection)?;
    match (json, conflicts) {
        (true, true) => super::print_json(&resolution.conflicts),
        (true, false) => super::print_json(&resolution),
        (false, true) => {
            print!("{}", resolution.conflicts);
            if resolution.conflicts.is_empty() {
                println!();
            }
            Ok(())
        }
        (false, false) => {
            print!("{}", ops_deps::render(&resolution));
            Ok(())
        }
    }
}
