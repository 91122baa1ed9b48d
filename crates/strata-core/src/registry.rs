//! Offline version registry declared in `[registry]`.
//!
//! Strata never downloads artifacts. The registry lists which versions of a
//! library are known to exist and what each platform (bill of materials) pins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Known library versions and platform pins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub libraries: BTreeMap<String, LibraryEntry>,

    /// Keyed by `group:artifact:version` of the platform itself; values map
    /// `group:artifact` to the pinned version.
    #[serde(default)]
    pub platforms: BTreeMap<String, BTreeMap<String, String>>,
}

/// A library entry in the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    #[serde(default)]
    pub versions: Vec<String>,
}

impl Registry {
    /// Known versions of `library` (`group:artifact`), empty when unlisted.
    pub fn versions(&self, library: &str) -> &[String] {
        self.libraries
            .get(library)
            .map(|entry| entry.versions.as_slice())
            .unwrap_or(&[])
    }

    /// Versions pinned by the platform `group:artifact` at `version`.
    pub fn platform(&self, platform: &str, version: &str) -> Option<&BTreeMap<String, String>> {
        self.platforms.get(&format!("{platform}:{version}"))
    }

    /// Versions of the platform `group:artifact` present in the registry.
    pub fn platform_versions(&self, platform: &str) -> Vec<&str> {
        let prefix = format!("{platform}:");
        self.platforms
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .collect()
    }
}
