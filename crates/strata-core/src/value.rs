//! Configuration values as they appear in fragments.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use strata_util::errors::StrataError;

/// A configuration value: a scalar, an ordered sequence, or a nested mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigValue>),
    Mapping(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "string",
            ConfigValue::Sequence(_) => "sequence",
            ConfigValue::Mapping(_) => "mapping",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            ConfigValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, ConfigValue::Sequence(_))
    }

    /// Convert a parsed TOML value. Datetimes have no configuration meaning
    /// and are rejected.
    pub fn from_toml(value: toml::Value) -> Result<Self, StrataError> {
        Ok(match value {
            toml::Value::Boolean(b) => ConfigValue::Bool(b),
            toml::Value::Integer(n) => ConfigValue::Integer(n),
            toml::Value::Float(f) => ConfigValue::Float(f),
            toml::Value::String(s) => ConfigValue::String(s),
            toml::Value::Array(items) => ConfigValue::Sequence(
                items
                    .into_iter()
                    .map(ConfigValue::from_toml)
                    .collect::<Result<_, _>>()?,
            ),
            toml::Value::Table(table) => ConfigValue::Mapping(
                table
                    .into_iter()
                    .map(|(k, v)| Ok((k, ConfigValue::from_toml(v)?)))
                    .collect::<Result<_, StrataError>>()?,
            ),
            toml::Value::Datetime(dt) => {
                return Err(StrataError::Manifest {
                    message: format!("datetime values are not supported as options (found {dt})"),
                })
            }
        })
    }

    /// Convert a TOML table into an option map.
    pub fn map_from_toml(
        table: BTreeMap<String, toml::Value>,
    ) -> Result<BTreeMap<String, ConfigValue>, StrataError> {
        table
            .into_iter()
            .map(|(k, v)| Ok((k, ConfigValue::from_toml(v)?)))
            .collect()
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Integer(n) => write!(f, "{n}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::String(s) => write!(f, "{s:?}"),
            ConfigValue::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ConfigValue::Mapping(map) => {
                if map.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} = {v}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Integer(n)
    }
}

impl From<i32> for ConfigValue {
    fn from(n: i32) -> Self {
        ConfigValue::Integer(i64::from(n))
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(items: Vec<T>) -> Self {
        ConfigValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Flatten an option map into `(dotted path, leaf)` pairs.
///
/// Mappings are descended into; everything else (including sequences and
/// empty mappings) is a leaf. Pairs come out in path order.
pub fn flatten(options: &BTreeMap<String, ConfigValue>) -> Vec<(String, &ConfigValue)> {
    let mut out = Vec::new();
    for (key, value) in options {
        flatten_into(key.clone(), value, &mut out);
    }
    out
}

fn flatten_into<'a>(path: String, value: &'a ConfigValue, out: &mut Vec<(String, &'a ConfigValue)>) {
    match value {
        ConfigValue::Mapping(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(format!("{path}.{key}"), child, out);
            }
        }
        _ => out.push((path, value)),
    }
}

/// Insert `value` at a dotted `path` inside `root`, creating mappings on the way.
pub fn insert_path(root: &mut BTreeMap<String, ConfigValue>, path: &str, value: ConfigValue) {
    match path.split_once('.') {
        None => {
            root.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = root
                .entry(head.to_string())
                .or_insert_with(|| ConfigValue::Mapping(BTreeMap::new()));
            if !matches!(entry, ConfigValue::Mapping(_)) {
                *entry = ConfigValue::Mapping(BTreeMap::new());
            }
            if let ConfigValue::Mapping(map) = entry {
                insert_path(map, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> BTreeMap<String, ConfigValue> {
        let table: BTreeMap<String, toml::Value> = toml::from_str(src).unwrap();
        ConfigValue::map_from_toml(table).unwrap()
    }

    #[test]
    fn converts_nested_toml() {
        let opts = parse(
            r#"
minSdkVersion = 21
plugins = ["a", "b"]
[compileOptions]
sourceCompatibility = "11"
"#,
        );
        assert_eq!(opts["minSdkVersion"], ConfigValue::Integer(21));
        assert_eq!(opts["plugins"], ConfigValue::from(vec!["a", "b"]));
        assert!(opts["compileOptions"].as_mapping().is_some());
    }

    #[test]
    fn rejects_datetime() {
        let table: BTreeMap<String, toml::Value> = toml::from_str("built = 1979-05-27").unwrap();
        assert!(ConfigValue::map_from_toml(table).is_err());
    }

    #[test]
    fn flatten_descends_mappings_only() {
        let opts = parse(
            r#"
deps = [{ coordinate = "g:a" }]
[android.defaultConfig]
minSdk = 21
[empty]
"#,
        );
        let paths: Vec<String> = flatten(&opts).into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["android.defaultConfig.minSdk", "deps", "empty"]);
    }

    #[test]
    fn insert_path_renests() {
        let mut root = BTreeMap::new();
        insert_path(&mut root, "a.b.c", ConfigValue::Integer(1));
        insert_path(&mut root, "a.d", ConfigValue::Bool(true));
        let a = root["a"].as_mapping().unwrap();
        assert_eq!(a["d"], ConfigValue::Bool(true));
        assert_eq!(a["b"].as_mapping().unwrap()["c"], ConfigValue::Integer(1));
    }

    #[test]
    fn display_is_toml_like() {
        let v = ConfigValue::from(vec!["x", "y"]);
        assert_eq!(v.to_string(), r#"["x", "y"]"#);
        assert_eq!(ConfigValue::Bool(false).to_string(), "false");
    }
}
