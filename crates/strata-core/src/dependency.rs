use serde::{Deserialize, Serialize};
use std::fmt;

use strata_util::errors::StrataError;

use crate::effective::EffectiveConfig;
use crate::value::ConfigValue;

/// Option path holding the dependency declarations.
pub const DEPENDENCIES_OPTION: &str = "dependencies";

/// Classpath scope of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    Compile,
    Runtime,
    Test,
}

impl Default for DependencyScope {
    fn default() -> Self {
        Self::Compile
    }
}

impl DependencyScope {
    /// Parse a scope name. Common Gradle configuration names are accepted as
    /// aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "compile" | "implementation" | "api" | "compileOnly" | "coreLibraryDesugaring" => {
                Some(Self::Compile)
            }
            "runtime" | "runtimeOnly" => Some(Self::Runtime),
            "test" | "testImplementation" | "androidTestImplementation" => Some(Self::Test),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Test => "test",
        })
    }
}

/// A library identity, `group:artifact`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
}

impl Coordinate {
    /// Parse `"group:artifact"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, artifact) = s.split_once(':')?;
        if group.is_empty() || artifact.is_empty() || artifact.contains(':') {
            return None;
        }
        Some(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

/// One dependency declaration after merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDecl {
    pub coordinate: Coordinate,
    /// Raw version requirement; `None` means "any", typically pinned by a platform.
    pub version: Option<String>,
    pub scope: DependencyScope,
    /// Import the platform's pinned versions instead of adding a library.
    pub platform: bool,
    /// Fragment scope that declared this dependency.
    pub declared_by: String,
}

impl DependencyDecl {
    /// Parse one element of the `dependencies` sequence.
    ///
    /// Accepts `"group:artifact[:version]"` or a table with `coordinate` and
    /// optional `version`, `scope`, `platform`.
    pub fn from_value(value: &ConfigValue, declared_by: &str) -> Result<Self, StrataError> {
        match value {
            ConfigValue::String(s) => Self::parse_short(s, declared_by),
            ConfigValue::Mapping(table) => {
                let coordinate_str = table
                    .get("coordinate")
                    .and_then(ConfigValue::as_str)
                    .ok_or_else(|| invalid(value, "missing string field `coordinate`"))?;
                let mut decl = Self::parse_short(coordinate_str, declared_by)?;
                if let Some(v) = table.get("version") {
                    let v = v
                        .as_str()
                        .ok_or_else(|| invalid(value, "`version` must be a string"))?;
                    decl.version = Some(v.to_string());
                }
                if let Some(scope) = table.get("scope") {
                    decl.scope = scope
                        .as_str()
                        .and_then(DependencyScope::parse)
                        .ok_or_else(|| invalid(value, &format!("unknown scope {scope}")))?;
                }
                if let Some(platform) = table.get("platform") {
                    decl.platform = platform
                        .as_bool()
                        .ok_or_else(|| invalid(value, "`platform` must be a boolean"))?;
                }
                for key in table.keys() {
                    if !matches!(key.as_str(), "coordinate" | "version" | "scope" | "platform") {
                        return Err(invalid(value, &format!("unknown field `{key}`")));
                    }
                }
                Ok(decl)
            }
            other => Err(invalid(other, "expected a string or a table")),
        }
    }

    fn parse_short(s: &str, declared_by: &str) -> Result<Self, StrataError> {
        let mut parts = s.splitn(3, ':');
        let (Some(group), Some(artifact)) = (parts.next(), parts.next()) else {
            return Err(StrataError::Manifest {
                message: format!("dependency `{s}` is not of the form group:artifact[:version]"),
            });
        };
        let coordinate = Coordinate::parse(&format!("{group}:{artifact}")).ok_or_else(|| {
            StrataError::Manifest {
                message: format!("dependency `{s}` has an empty group or artifact"),
            }
        })?;
        let version = parts
            .next()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(Self {
            coordinate,
            version,
            scope: DependencyScope::Compile,
            platform: false,
            declared_by: declared_by.to_string(),
        })
    }
}

fn invalid(value: &ConfigValue, message: &str) -> StrataError {
    StrataError::Manifest {
        message: format!("invalid dependency {value}: {message}"),
    }
}

/// Extract dependency declarations from an effective configuration, in
/// merged order, each tagged with the fragment that declared it.
pub fn dependencies_from(config: &EffectiveConfig) -> Result<Vec<DependencyDecl>, StrataError> {
    let Some(option) = config.option(DEPENDENCIES_OPTION) else {
        return Ok(Vec::new());
    };
    let items = option
        .value
        .as_sequence()
        .ok_or_else(|| StrataError::InvalidOption {
            option: DEPENDENCIES_OPTION.to_string(),
            message: format!("expected sequence, found {}", option.value.type_name()),
        })?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| DependencyDecl::from_value(item, option.source_of(i)))
        .collect()
}
