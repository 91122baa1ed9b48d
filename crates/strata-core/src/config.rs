use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration loaded from `~/.strata/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub build: BuildConfig,
}

/// Build settings from `[build]` in global config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Upper bound on concurrently executing tasks.
    #[serde(default = "default_jobs")]
    pub jobs: u32,
    #[serde(default, rename = "default-module")]
    pub default_module: Option<String>,
    #[serde(default, rename = "default-variant")]
    pub default_variant: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            default_module: None,
            default_variant: None,
        }
    }
}

fn default_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
}

impl GlobalConfig {
    /// Load the global configuration from `~/.strata/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path, returning defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            strata_util::errors::StrataError::Generic {
                message: format!("Failed to read global config: {e}"),
            }
        })?;
        toml::from_str(&content).map_err(|e| {
            strata_util::errors::StrataError::Generic {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the Strata data directory (`~/.strata/`).
///
/// `STRATA_HOME` overrides the location.
pub fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var("STRATA_HOME") {
        return PathBuf::from(home);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".strata")
}
