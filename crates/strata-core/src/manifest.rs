use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use strata_util::errors::StrataError;

use crate::fragment::{ConfigFragment, FragmentStore, Layer};
use crate::layout::OutputLayout;
use crate::registry::Registry;
use crate::value::ConfigValue;

/// Scope name of the `[defaults]` fragment.
pub const ROOT_SCOPE: &str = "root";

/// Scope name of the `[finalize]` fragment.
pub const FINALIZE_SCOPE: &str = "finalize";

/// The parsed representation of a `Strata.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub project: ProjectMetadata,

    /// Root-layer options shared by every module.
    #[serde(default)]
    pub defaults: BTreeMap<String, toml::Value>,

    /// Options forced onto every target after merging.
    #[serde(default)]
    pub finalize: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub modules: BTreeMap<String, ModuleDecl>,

    /// Additional fragments at any layer.
    #[serde(default)]
    pub fragments: Vec<FragmentDecl>,

    #[serde(default)]
    pub registry: Registry,
}

/// Project identity from the `[project]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    /// Root build directory, relative to the manifest.
    #[serde(default = "default_build_dir", rename = "build-dir")]
    pub build_dir: String,
}

fn default_build_dir() -> String {
    "build".to_string()
}

/// A module from `[modules.<name>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDecl {
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub replace: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub variants: BTreeMap<String, VariantDecl>,
}

/// A variant from `[modules.<name>.variants.<variant>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDecl {
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub replace: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

/// A free-standing fragment from `[[fragments]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FragmentDecl {
    pub scope: String,
    pub layer: Layer,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub replace: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

impl Manifest {
    /// Load and parse a `Strata.toml` file from the given path.
    ///
    /// Before parsing, `${env:VAR}` references are resolved using
    /// `.strata.env` (if present alongside the manifest) and process
    /// environment variables, and `${prop:key}` references using
    /// `local.properties`.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StrataError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;

        let dir = path.parent().unwrap_or(Path::new("."));
        let env_vars = crate::properties::load_env_file(&dir.join(".strata.env"))?;
        let props = crate::properties::load_properties(&dir.join("local.properties"))?;
        let resolved = crate::properties::interpolate(&content, &env_vars, &props);

        Self::parse_toml(&resolved)
    }

    /// Parse a `Strata.toml` from a string (no interpolation).
    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            StrataError::Manifest {
                message: format!("Failed to parse Strata.toml: {e}"),
            }
            .into()
        })
    }

    /// Output layout for a manifest located in `project_dir`.
    pub fn layout(&self, project_dir: &Path) -> OutputLayout {
        OutputLayout::new(project_dir, &self.project.build_dir)
    }

    /// Build the fragment store: `[defaults]`, every module and variant, then
    /// the free-standing `[[fragments]]`.
    pub fn fragment_store(&self) -> Result<FragmentStore, StrataError> {
        let mut store = FragmentStore::new();

        if !self.defaults.is_empty() {
            store.insert(ConfigFragment::root(ROOT_SCOPE, convert(&self.defaults)?))?;
        }

        for (name, module) in &self.modules {
            store.insert(ConfigFragment {
                rank: module.rank,
                replace: to_set(&module.replace),
                ..ConfigFragment::module(name, convert(&module.options)?)
            })?;
            for (variant_name, variant) in &module.variants {
                store.insert(ConfigFragment {
                    rank: variant.rank,
                    replace: to_set(&variant.replace),
                    ..ConfigFragment::variant(name, variant_name, convert(&variant.options)?)
                })?;
            }
        }

        for decl in &self.fragments {
            store.insert(ConfigFragment {
                scope: decl.scope.clone(),
                layer: decl.layer,
                module: decl.module.clone(),
                variant: decl.variant.clone(),
                rank: decl.rank,
                replace: to_set(&decl.replace),
                options: convert(&decl.options)?,
            })?;
        }

        Ok(store)
    }

    /// The `[finalize]` block as a fragment, if declared.
    pub fn finalize_fragment(&self) -> Result<Option<ConfigFragment>, StrataError> {
        if self.finalize.is_empty() {
            return Ok(None);
        }
        let fragment = ConfigFragment::root(FINALIZE_SCOPE, convert(&self.finalize)?);
        fragment.validate()?;
        Ok(Some(fragment))
    }
}

fn convert(table: &BTreeMap<String, toml::Value>) -> Result<BTreeMap<String, ConfigValue>, StrataError> {
    ConfigValue::map_from_toml(table.clone())
}

fn to_set(paths: &[String]) -> BTreeSet<String> {
    paths.iter().cloned().collect()
}
