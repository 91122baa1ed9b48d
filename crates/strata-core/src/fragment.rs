//! Configuration fragments and the store that owns them for one invocation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use strata_util::errors::StrataError;

use crate::value::ConfigValue;

/// Precedence level of a fragment. Later variants win over earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Root,
    Module,
    Variant,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Layer::Root => "root",
            Layer::Module => "module",
            Layer::Variant => "variant",
        })
    }
}

/// One named, independently declared configuration unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFragment {
    pub scope: String,
    pub layer: Layer,
    /// Module this fragment applies to (module and variant layers).
    pub module: Option<String>,
    /// Variant this fragment applies to (variant layer only).
    pub variant: Option<String>,
    /// Declared tie-break among fragments of the same layer; higher wins.
    pub rank: Option<i64>,
    /// Option paths whose value replaces lower layers instead of extending them.
    pub replace: BTreeSet<String>,
    pub options: BTreeMap<String, ConfigValue>,
}

impl ConfigFragment {
    /// Create a root-layer fragment with no tie-break or replace flags.
    pub fn root(scope: impl Into<String>, options: BTreeMap<String, ConfigValue>) -> Self {
        Self {
            scope: scope.into(),
            layer: Layer::Root,
            module: None,
            variant: None,
            rank: None,
            replace: BTreeSet::new(),
            options,
        }
    }

    /// Create a module-layer fragment scoped to `module`.
    pub fn module(module: &str, options: BTreeMap<String, ConfigValue>) -> Self {
        Self {
            scope: module.to_string(),
            layer: Layer::Module,
            module: Some(module.to_string()),
            ..Self::root(module, options)
        }
    }

    /// Create a variant-layer fragment scoped to `module/variant`.
    pub fn variant(module: &str, variant: &str, options: BTreeMap<String, ConfigValue>) -> Self {
        Self {
            scope: format!("{module}/{variant}"),
            layer: Layer::Variant,
            module: Some(module.to_string()),
            variant: Some(variant.to_string()),
            ..Self::root("", options)
        }
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = Some(rank);
        self
    }

    pub fn with_replace(mut self, path: impl Into<String>) -> Self {
        self.replace.insert(path.into());
        self
    }

    /// Rank used for ordering and tie-breaks; undeclared ranks count as 0.
    pub fn effective_rank(&self) -> i64 {
        self.rank.unwrap_or(0)
    }

    /// The replace root covering `path`, if this fragment declared one.
    pub fn replace_root_for(&self, path: &str) -> Option<&str> {
        self.replace
            .iter()
            .find(|root| path == root.as_str() || path.starts_with(&format!("{root}.")))
            .map(String::as_str)
    }

    /// Check structural invariants: scope present, target fields consistent
    /// with the layer, and option keys free of path separators.
    pub fn validate(&self) -> Result<(), StrataError> {
        if self.scope.trim().is_empty() {
            return Err(StrataError::Fragment {
                message: "fragment scope must not be empty".to_string(),
            });
        }
        let consistent = match self.layer {
            Layer::Root => self.module.is_none() && self.variant.is_none(),
            Layer::Module => self.module.is_some() && self.variant.is_none(),
            Layer::Variant => self.module.is_some() && self.variant.is_some(),
        };
        if !consistent {
            return Err(StrataError::Fragment {
                message: format!(
                    "fragment `{}` at layer {} must name {}",
                    self.scope,
                    self.layer,
                    match self.layer {
                        Layer::Root => "neither a module nor a variant",
                        Layer::Module => "a module and no variant",
                        Layer::Variant => "both a module and a variant",
                    }
                ),
            });
        }
        check_keys(&self.scope, &self.options)
    }
}

fn check_keys(scope: &str, options: &BTreeMap<String, ConfigValue>) -> Result<(), StrataError> {
    for (key, value) in options {
        if key.is_empty() || key.contains('.') {
            return Err(StrataError::Fragment {
                message: format!("fragment `{scope}` has invalid option key `{key}`"),
            });
        }
        if let ConfigValue::Mapping(map) = value {
            check_keys(scope, map)?;
        }
    }
    Ok(())
}

/// Owns every fragment loaded for one build invocation.
#[derive(Debug, Default)]
pub struct FragmentStore {
    fragments: Vec<ConfigFragment>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment. Scopes must be unique within the store.
    pub fn insert(&mut self, fragment: ConfigFragment) -> Result<(), StrataError> {
        fragment.validate()?;
        if self.get(&fragment.scope).is_some() {
            return Err(StrataError::Fragment {
                message: format!("duplicate fragment scope `{}`", fragment.scope),
            });
        }
        tracing::debug!("loaded fragment `{}` ({})", fragment.scope, fragment.layer);
        self.fragments.push(fragment);
        Ok(())
    }

    pub fn get(&self, scope: &str) -> Option<&ConfigFragment> {
        self.fragments.iter().find(|f| f.scope == scope)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigFragment> {
        self.fragments.iter()
    }

    /// Every module named by a module- or variant-layer fragment, sorted.
    pub fn modules(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .fragments
            .iter()
            .filter_map(|f| f.module.as_deref())
            .collect();
        set.into_iter().collect()
    }

    /// Every variant declared for `module`, sorted.
    pub fn variants(&self, module: &str) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .fragments
            .iter()
            .filter(|f| f.module.as_deref() == Some(module))
            .filter_map(|f| f.variant.as_deref())
            .collect();
        set.into_iter().collect()
    }

    /// Fragments applicable to one target, in ascending precedence order.
    ///
    /// Within a layer the insertion order is kept.
    pub fn fragments_for(&self, module: &str, variant: Option<&str>) -> Vec<&ConfigFragment> {
        let mut selected: Vec<&ConfigFragment> = self
            .fragments
            .iter()
            .filter(|f| match f.layer {
                Layer::Root => true,
                Layer::Module => f.module.as_deref() == Some(module),
                Layer::Variant => {
                    variant.is_some()
                        && f.module.as_deref() == Some(module)
                        && f.variant.as_deref() == variant
                }
            })
            .collect();
        selected.sort_by_key(|f| f.layer);
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(key: &str, value: ConfigValue) -> BTreeMap<String, ConfigValue> {
        BTreeMap::from([(key.to_string(), value)])
    }

    #[test]
    fn layer_ordering() {
        assert!(Layer::Root < Layer::Module);
        assert!(Layer::Module < Layer::Variant);
    }

    #[test]
    fn duplicate_scope_rejected() {
        let mut store = FragmentStore::new();
        store
            .insert(ConfigFragment::root("root", BTreeMap::new()))
            .unwrap();
        assert!(store
            .insert(ConfigFragment::root("root", BTreeMap::new()))
            .is_err());
    }

    #[test]
    fn dotted_keys_rejected() {
        let fragment = ConfigFragment::root("root", opts("a.b", ConfigValue::Bool(true)));
        assert!(fragment.validate().is_err());
    }

    #[test]
    fn variant_layer_requires_module_and_variant() {
        let mut fragment = ConfigFragment::variant("app", "release", BTreeMap::new());
        assert!(fragment.validate().is_ok());
        fragment.module = None;
        assert!(fragment.validate().is_err());
    }

    #[test]
    fn fragments_for_selects_and_orders() {
        let mut store = FragmentStore::new();
        store
            .insert(ConfigFragment::variant("app", "release", BTreeMap::new()))
            .unwrap();
        store
            .insert(ConfigFragment::module("app", BTreeMap::new()))
            .unwrap();
        store
            .insert(ConfigFragment::module("lib", BTreeMap::new()))
            .unwrap();
        store
            .insert(ConfigFragment::root("root", BTreeMap::new()))
            .unwrap();

        let scopes: Vec<&str> = store
            .fragments_for("app", Some("release"))
            .iter()
            .map(|f| f.scope.as_str())
            .collect();
        assert_eq!(scopes, vec!["root", "app", "app/release"]);

        let scopes: Vec<&str> = store
            .fragments_for("app", None)
            .iter()
            .map(|f| f.scope.as_str())
            .collect();
        assert_eq!(scopes, vec!["root", "app"]);

        assert_eq!(store.modules(), vec!["app", "lib"]);
        assert_eq!(store.variants("app"), vec!["release"]);
    }

    #[test]
    fn replace_root_matches_subpaths() {
        let fragment = ConfigFragment::root("root", BTreeMap::new()).with_replace("android");
        assert_eq!(fragment.replace_root_for("android.minSdk"), Some("android"));
        assert_eq!(fragment.replace_root_for("android"), Some("android"));
        assert_eq!(fragment.replace_root_for("androidx"), None);
    }
}
