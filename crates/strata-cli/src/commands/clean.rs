use miette::Result;

use strata_ops::ops_clean::{self, CleanResult};
use strata_ops::ProjectContext;

pub fn exec(ctx: &ProjectContext) -> Result<()> {
    match ops_clean::clean(ctx)? {
        CleanResult::Cleaned(dir) => println!("Cleaned {}", dir.display()),
        CleanResult::NothingToClean => println!("Nothing to clean"),
    }
    Ok(())
}
