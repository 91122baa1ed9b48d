use std::collections::BTreeMap;

use strata_core::fragment::ConfigFragment;
use strata_core::value::ConfigValue;
use strata_resolver::merge::merge;
use strata_util::errors::StrataError;

fn options(toml_src: &str) -> BTreeMap<String, ConfigValue> {
    let table: BTreeMap<String, toml::Value> = toml::from_str(toml_src).unwrap();
    ConfigValue::map_from_toml(table).unwrap()
}

fn fragments() -> Vec<ConfigFragment> {
    vec![
        ConfigFragment::root(
            "root",
            options(
                r#"
compileSdkVersion = 34
plugins = ["com.android.application"]
[lint]
abortOnError = false
"#,
            ),
        ),
        ConfigFragment::root("shared", options(r#"plugins = ["kotlin-android"]"#)),
        ConfigFragment::module(
            "app",
            options(
                r#"
compileSdkVersion = 35
plugins = ["com.google.gms.google-services"]
[lint]
checkReleaseBuilds = true
"#,
            ),
        ),
        ConfigFragment::variant("app", "release", options("minifyEnabled = true")),
    ]
}

#[test]
fn test_same_layer_order_does_not_matter() {
    let owned = fragments();
    let forward: Vec<&ConfigFragment> = owned.iter().collect();
    let swapped = vec![&owned[1], &owned[0], &owned[2], &owned[3]];
    assert_eq!(
        merge("app/release", &forward).unwrap(),
        merge("app/release", &swapped).unwrap()
    );
}

#[test]
fn test_merge_is_idempotent_through_to_fragment() {
    let owned = fragments();
    let refs: Vec<&ConfigFragment> = owned.iter().collect();
    let first = merge("app/release", &refs).unwrap();
    let flattened = first.to_fragment("flattened");
    let second = merge("app/release", &[&flattened]).unwrap();

    assert_eq!(first.to_value(), second.to_value());
    assert_eq!(second.get_integer("compileSdkVersion").unwrap(), Some(35));
    assert_eq!(second.get_bool("lint.abortOnError").unwrap(), Some(false));
    assert_eq!(second.get_bool("lint.checkReleaseBuilds").unwrap(), Some(true));
}

#[test]
fn test_nested_mappings_merge_per_leaf() {
    let owned = fragments();
    let refs: Vec<&ConfigFragment> = owned.iter().collect();
    let config = merge("app/release", &refs).unwrap();
    assert_eq!(config.option("lint.abortOnError").unwrap().sources, vec!["root"]);
    assert_eq!(config.option("lint.checkReleaseBuilds").unwrap().sources, vec!["app"]);
    assert_eq!(config.option("compileSdkVersion").unwrap().sources, vec!["app"]);
}

#[test]
fn test_root_fragments_conflict_without_rank() {
    let a = ConfigFragment::root("a", options("compileSdkVersion = 34"));
    let b = ConfigFragment::root("b", options("compileSdkVersion = 35"));
    let err = merge("app", &[&a, &b]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Conflicting values for option `compileSdkVersion` at the same precedence level: a, b"
    );

    let b = b.with_rank(1);
    let config = merge("app", &[&a, &b]).unwrap();
    assert_eq!(config.get_integer("compileSdkVersion").unwrap(), Some(35));
}

#[test]
fn test_replaced_sequences_conflict_within_layer() {
    let a = ConfigFragment::module("app", options(r#"plugins = ["a"]"#)).with_replace("plugins");
    let mut b = ConfigFragment::module("app", options(r#"plugins = ["b"]"#));
    b.scope = "app-extra".to_string();
    assert!(matches!(
        merge("app", &[&a, &b]),
        Err(StrataError::ConfigConflict { .. })
    ));
}
