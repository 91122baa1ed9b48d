//! The merged, precedence-resolved configuration of one build target.

use serde::Serialize;
use std::collections::BTreeMap;

use strata_util::errors::StrataError;

use crate::fragment::ConfigFragment;
use crate::value::{insert_path, ConfigValue};

/// Scope recorded for values supplied by a schema default.
pub const DEFAULT_SOURCE: &str = "<default>";

/// A leaf value plus the fragment scope(s) that supplied it.
///
/// Scalars carry one source; sequences carry one source per element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOption {
    pub value: ConfigValue,
    pub sources: Vec<String>,
}

impl ResolvedOption {
    /// A leaf supplied entirely by one scope.
    pub fn from_scope(value: ConfigValue, scope: &str) -> Self {
        let sources = match &value {
            ConfigValue::Sequence(items) => vec![scope.to_string(); items.len()],
            _ => vec![scope.to_string()],
        };
        Self { value, sources }
    }

    /// Source of the `index`-th sequence element, or of the scalar itself.
    pub fn source_of(&self, index: usize) -> &str {
        self.sources
            .get(index)
            .or_else(|| self.sources.last())
            .map(String::as_str)
            .unwrap_or(DEFAULT_SOURCE)
    }

    /// Append sequence elements not already present, keeping their sources.
    /// Returns the number of elements added.
    pub fn extend_unique(&mut self, other: &ResolvedOption) -> usize {
        let ConfigValue::Sequence(items) = &mut self.value else {
            return 0;
        };
        let Some(incoming) = other.value.as_sequence() else {
            return 0;
        };
        let mut added = 0;
        for (i, item) in incoming.iter().enumerate() {
            if !items.contains(item) {
                items.push(item.clone());
                self.sources.push(other.source_of(i).to_string());
                added += 1;
            }
        }
        added
    }
}

/// Flattened effective configuration keyed by dotted option path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    target: String,
    options: BTreeMap<String, ResolvedOption>,
}

impl EffectiveConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            options: BTreeMap::new(),
        }
    }

    /// Target name, `module` or `module/variant`.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedOption)> {
        self.options.iter()
    }

    pub fn option(&self, path: &str) -> Option<&ResolvedOption> {
        self.options.get(path)
    }

    pub fn option_mut(&mut self, path: &str) -> Option<&mut ResolvedOption> {
        self.options.get_mut(path)
    }

    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        self.options.get(path).map(|o| &o.value)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.options.contains_key(path)
    }

    /// Set a leaf, discarding whatever previously occupied the same place in
    /// the tree: the leaf itself, any ancestor leaf, and any descendant.
    pub fn set(&mut self, path: &str, option: ResolvedOption) {
        self.remove_subtree(path);
        let mut prefix = String::new();
        for part in path.split('.') {
            if !prefix.is_empty() {
                self.options.remove(&prefix);
                prefix.push('.');
            }
            prefix.push_str(part);
        }
        self.options.insert(path.to_string(), option);
    }

    /// Remove a leaf and every descendant of `path`.
    pub fn remove_subtree(&mut self, path: &str) -> usize {
        let child_prefix = format!("{path}.");
        let before = self.options.len();
        self.options
            .retain(|key, _| key != path && !key.starts_with(&child_prefix));
        before - self.options.len()
    }

    /// String option, `Ok(None)` when absent, an error when mistyped.
    pub fn get_str(&self, path: &str) -> Result<Option<&str>, StrataError> {
        self.typed(path, "string", ConfigValue::as_str)
    }

    pub fn get_integer(&self, path: &str) -> Result<Option<i64>, StrataError> {
        self.typed(path, "integer", ConfigValue::as_integer)
    }

    pub fn get_bool(&self, path: &str) -> Result<Option<bool>, StrataError> {
        self.typed(path, "boolean", ConfigValue::as_bool)
    }

    pub fn get_sequence(&self, path: &str) -> Result<Option<&[ConfigValue]>, StrataError> {
        self.typed(path, "sequence", ConfigValue::as_sequence)
    }

    fn typed<'a, T>(
        &'a self,
        path: &str,
        expected: &str,
        extract: impl Fn(&'a ConfigValue) -> Option<T>,
    ) -> Result<Option<T>, StrataError> {
        match self.get(path) {
            None => Ok(None),
            Some(value) => extract(value).map(Some).ok_or_else(|| StrataError::InvalidOption {
                option: path.to_string(),
                message: format!("expected {expected}, found {}", value.type_name()),
            }),
        }
    }

    /// Re-nest the flattened options into one mapping value.
    pub fn to_value(&self) -> ConfigValue {
        let mut root = BTreeMap::new();
        for (path, option) in &self.options {
            insert_path(&mut root, path, option.value.clone());
        }
        ConfigValue::Mapping(root)
    }

    /// Package the effective values as a single root-layer fragment.
    pub fn to_fragment(&self, scope: &str) -> ConfigFragment {
        let options = match self.to_value() {
            ConfigValue::Mapping(map) => map,
            _ => BTreeMap::new(),
        };
        ConfigFragment::root(scope, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Layer;

    fn leaf(value: impl Into<ConfigValue>, scope: &str) -> ResolvedOption {
        ResolvedOption::from_scope(value.into(), scope)
    }

    #[test]
    fn set_replaces_ancestor_and_descendants() {
        let mut config = EffectiveConfig::new("app");
        config.set("android.minSdk", leaf(21, "root"));
        config.set("android.targetSdk", leaf(34, "root"));
        config.set("android", leaf("disabled", "app"));
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("android"), Some(&ConfigValue::from("disabled")));

        config.set("android.minSdk", leaf(23, "app/release"));
        assert!(!config.contains("android"));
        assert_eq!(config.get_integer("android.minSdk").unwrap(), Some(23));
    }

    #[test]
    fn typed_getter_reports_mismatch() {
        let mut config = EffectiveConfig::new("app");
        config.set("minifyEnabled", leaf("yes", "root"));
        let err = config.get_bool("minifyEnabled").unwrap_err();
        assert!(err.to_string().contains("expected boolean, found string"));
        assert_eq!(config.get_bool("missing").unwrap(), None);
    }

    #[test]
    fn extend_unique_tracks_sources() {
        let mut base = leaf(vec!["a", "b"], "root");
        let added = base.extend_unique(&leaf(vec!["b", "c"], "app"));
        assert_eq!(added, 1);
        assert_eq!(base.value, ConfigValue::from(vec!["a", "b", "c"]));
        assert_eq!(base.sources, vec!["root", "root", "app"]);
        assert_eq!(base.source_of(2), "app");
    }

    #[test]
    fn to_value_renests() {
        let mut config = EffectiveConfig::new("app");
        config.set("compileOptions.sourceCompatibility", leaf("11", "root"));
        config.set("applicationId", leaf("grati.stellar.app", "app"));
        let value = config.to_value();
        let map = value.as_mapping().unwrap();
        assert_eq!(map["applicationId"], ConfigValue::from("grati.stellar.app"));
        assert!(map["compileOptions"].as_mapping().is_some());

        let fragment = config.to_fragment("flattened");
        assert_eq!(fragment.layer, Layer::Root);
        assert_eq!(fragment.options.len(), 2);
    }
}
