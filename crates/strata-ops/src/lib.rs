pub mod ops_clean;
pub mod ops_config;
pub mod ops_deps;
pub mod ops_explain;
pub mod ops_plan;
pub mod ops_run;

use std::path::{Path, PathBuf};

use strata_core::config::GlobalConfig;
use strata_core::effective::EffectiveConfig;
use strata_core::fragment::{ConfigFragment, FragmentStore};
use strata_core::layout::OutputLayout;
use strata_core::manifest::Manifest;
use strata_core::MANIFEST_FILE;
use strata_resolver::target::resolve_target;
use strata_util::errors::StrataError;
use strata_util::fs::find_ancestor_with;

/// Which target a command works on. Unset fields fall back to the global
/// configuration, then to the project's only module.
#[derive(Debug, Clone, Default)]
pub struct TargetSelection {
    pub module: Option<String>,
    pub variant: Option<String>,
}

/// Everything loaded from one build definition.
pub struct ProjectContext {
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub store: FragmentStore,
    pub finalize: Option<ConfigFragment>,
    pub layout: OutputLayout,
    pub global: GlobalConfig,
}

impl ProjectContext {
    /// Locate `Strata.toml` in `start` or one of its ancestors.
    pub fn discover(start: &Path) -> miette::Result<PathBuf> {
        let dir = find_ancestor_with(start, MANIFEST_FILE).ok_or_else(|| StrataError::Manifest {
            message: format!("Could not find {MANIFEST_FILE} in current or parent directories"),
        })?;
        Ok(dir.join(MANIFEST_FILE))
    }

    pub fn load(manifest_path: &Path) -> miette::Result<Self> {
        Self::load_with(manifest_path, GlobalConfig::load()?)
    }

    pub fn load_with(manifest_path: &Path, global: GlobalConfig) -> miette::Result<Self> {
        let manifest = Manifest::from_path(manifest_path)?;
        let project_dir = manifest_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let store = manifest.fragment_store()?;
        let finalize = manifest.finalize_fragment()?;
        let layout = manifest.layout(project_dir);
        tracing::debug!(
            "loaded {} with {} fragment(s)",
            manifest_path.display(),
            store.len()
        );
        Ok(Self {
            manifest_path: manifest_path.to_path_buf(),
            manifest,
            store,
            finalize,
            layout,
            global,
        })
    }

    /// The module a command should use.
    pub fn select_module(&self, requested: Option<&str>) -> miette::Result<String> {
        let modules = self.store.modules();
        if let Some(name) = requested.or(self.global.build.default_module.as_deref()) {
            if modules.contains(&name) {
                return Ok(name.to_string());
            }
            return Err(StrataError::Generic {
                message: format!(
                    "unknown module `{name}` (declared: {})",
                    modules.join(", ")
                ),
            }
            .into());
        }
        match modules.as_slice() {
            [only] => Ok(only.to_string()),
            [] => Err(StrataError::Manifest {
                message: "the build definition declares no modules".to_string(),
            }
            .into()),
            _ => Err(StrataError::Generic {
                message: format!(
                    "several modules declared ({}); pick one with --module",
                    modules.join(", ")
                ),
            }
            .into()),
        }
    }

    /// The variant a command should use. The global default only applies to
    /// modules that declare it.
    pub fn select_variant(&self, module: &str, requested: Option<&str>) -> Option<String> {
        if let Some(v) = requested {
            return Some(v.to_string());
        }
        let fallback = self.global.build.default_variant.as_deref()?;
        self.store
            .variants(module)
            .contains(&fallback)
            .then(|| fallback.to_string())
    }

    /// Resolve the effective configuration of the selected target.
    pub fn resolve(&self, selection: &TargetSelection) -> miette::Result<(String, EffectiveConfig)> {
        let module = self.select_module(selection.module.as_deref())?;
        let variant = self.select_variant(&module, selection.variant.as_deref());
        let config = resolve_target(
            &self.store,
            self.finalize.as_ref(),
            &self.layout,
            &module,
            variant.as_deref(),
        )?;
        Ok((module, config))
    }
}
