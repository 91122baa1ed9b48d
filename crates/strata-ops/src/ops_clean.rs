//! Operation: remove the project build directory.

use std::path::PathBuf;

use strata_util::errors::StrataError;
use strata_util::fs::remove_dir_if_exists;

use crate::ProjectContext;

/// Result of a clean operation.
#[derive(Debug, PartialEq, Eq)]
pub enum CleanResult {
    Cleaned(PathBuf),
    NothingToClean,
}

pub fn clean(ctx: &ProjectContext) -> miette::Result<CleanResult> {
    let build_dir = ctx.layout.build_dir();
    if remove_dir_if_exists(build_dir).map_err(StrataError::Io)? {
        Ok(CleanResult::Cleaned(build_dir.to_path_buf()))
    } else {
        Ok(CleanResult::NothingToClean)
    }
}
