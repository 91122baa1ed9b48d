//! Output directory layout, threaded explicitly through a resolution pass.

use std::path::{Path, PathBuf};

use strata_util::fs::normalize;

/// Where build outputs go. Each module's output directory is derived from the
/// project build directory rather than set by a module itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    project_dir: PathBuf,
    build_dir: PathBuf,
}

impl OutputLayout {
    /// `build_dir` is resolved against `project_dir` when relative.
    pub fn new(project_dir: &Path, build_dir: &str) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            build_dir: normalize(&project_dir.join(build_dir)),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Root build directory shared by every module.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Output directory of one module.
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.build_dir.join(module)
    }

    /// Resolve a path declared in the build definition.
    pub fn resolve(&self, path: &str) -> PathBuf {
        normalize(&self.project_dir.join(path))
    }
}
