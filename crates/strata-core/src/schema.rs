//! Known options of an application module: types, documented defaults, and
//! the rules that tie them together.
//!
//! Options not listed here pass through resolution untouched.

use strata_util::errors::StrataError;

use crate::effective::{EffectiveConfig, ResolvedOption, DEFAULT_SOURCE};
use crate::value::ConfigValue;

/// Value type an option must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Integer,
    String,
    /// Java language level, normalized to `1.8`, `11`, `17`, or `21`.
    LanguageLevel,
}

/// What happens when no fragment supplies an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Required,
    Bool(bool),
    Integer(i64),
    Str(&'static str),
    /// Copy the (already resolved) value of another option.
    SameAs(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub key: &'static str,
    pub kind: OptionKind,
    pub default: DefaultValue,
}

/// Options are processed in this order, so `SameAs` must point upwards.
pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec { key: "applicationId", kind: OptionKind::String, default: DefaultValue::Required },
    OptionSpec { key: "compileSdkVersion", kind: OptionKind::Integer, default: DefaultValue::Required },
    OptionSpec { key: "minSdkVersion", kind: OptionKind::Integer, default: DefaultValue::Required },
    OptionSpec { key: "targetSdkVersion", kind: OptionKind::Integer, default: DefaultValue::SameAs("compileSdkVersion") },
    OptionSpec { key: "versionCode", kind: OptionKind::Integer, default: DefaultValue::Integer(1) },
    OptionSpec { key: "versionName", kind: OptionKind::String, default: DefaultValue::Str("1.0") },
    OptionSpec { key: "minifyEnabled", kind: OptionKind::Bool, default: DefaultValue::Bool(false) },
    OptionSpec { key: "shrinkResources", kind: OptionKind::Bool, default: DefaultValue::Bool(false) },
    OptionSpec { key: "coreLibraryDesugaringEnabled", kind: OptionKind::Bool, default: DefaultValue::Bool(false) },
    OptionSpec { key: "multiDexEnabled", kind: OptionKind::Bool, default: DefaultValue::Bool(false) },
    OptionSpec { key: "sourceCompatibility", kind: OptionKind::LanguageLevel, default: DefaultValue::Str("11") },
    OptionSpec { key: "targetCompatibility", kind: OptionKind::LanguageLevel, default: DefaultValue::Str("11") },
];

/// Look up a known option by key.
pub fn spec(key: &str) -> Option<&'static OptionSpec> {
    OPTIONS.iter().find(|s| s.key == key)
}

/// Normalize a language level: `VERSION_11`, `11` and `"11"` are the same
/// level, as are `1.8`, `8` and `VERSION_1_8`.
pub fn normalize_language_level(value: &ConfigValue) -> Option<&'static str> {
    let raw = match value {
        ConfigValue::Integer(n) => n.to_string(),
        ConfigValue::String(s) => s.trim().trim_start_matches("VERSION_").replace('_', "."),
        _ => return None,
    };
    match raw.as_str() {
        "1.8" | "8" => Some("1.8"),
        "11" => Some("11"),
        "17" => Some("17"),
        "21" => Some("21"),
        _ => None,
    }
}

/// Apply defaults, check types, and enforce cross-option rules.
///
/// Fails with `MissingRequiredOption` for a required option no fragment
/// supplied, and with `InvalidOption` for a mistyped value or a broken rule.
pub fn apply(config: &mut EffectiveConfig) -> Result<(), StrataError> {
    for spec in OPTIONS {
        match config.get(spec.key).cloned() {
            Some(value) => check_kind(config, spec, &value)?,
            None => fill_default(config, spec)?,
        }
    }
    check_rules(config)
}

fn check_kind(
    config: &mut EffectiveConfig,
    spec: &OptionSpec,
    value: &ConfigValue,
) -> Result<(), StrataError> {
    let ok = match spec.kind {
        OptionKind::Bool => value.as_bool().is_some(),
        OptionKind::Integer => value.as_integer().is_some(),
        OptionKind::String => value.as_str().is_some(),
        OptionKind::LanguageLevel => match normalize_language_level(value) {
            Some(level) => {
                if let Some(option) = config.option_mut(spec.key) {
                    option.value = ConfigValue::from(level);
                }
                true
            }
            None => {
                return Err(StrataError::InvalidOption {
                    option: spec.key.to_string(),
                    message: format!("unsupported language level {value}"),
                })
            }
        },
    };
    if ok {
        Ok(())
    } else {
        Err(StrataError::InvalidOption {
            option: spec.key.to_string(),
            message: format!(
                "expected {}, found {}",
                match spec.kind {
                    OptionKind::Bool => "boolean",
                    OptionKind::Integer => "integer",
                    _ => "string",
                },
                value.type_name()
            ),
        })
    }
}

fn fill_default(config: &mut EffectiveConfig, spec: &OptionSpec) -> Result<(), StrataError> {
    let value = match spec.default {
        DefaultValue::Required => {
            return Err(StrataError::MissingRequiredOption {
                option: spec.key.to_string(),
                target: config.target().to_string(),
            })
        }
        DefaultValue::Bool(b) => ConfigValue::Bool(b),
        DefaultValue::Integer(n) => ConfigValue::Integer(n),
        DefaultValue::Str(s) => ConfigValue::from(s),
        DefaultValue::SameAs(other) => match config.get(other) {
            Some(v) => v.clone(),
            None => {
                return Err(StrataError::MissingRequiredOption {
                    option: spec.key.to_string(),
                    target: config.target().to_string(),
                })
            }
        },
    };
    tracing::debug!("{}: defaulting `{}` to {value}", config.target(), spec.key);
    config.set(spec.key, ResolvedOption::from_scope(value, DEFAULT_SOURCE));
    Ok(())
}

fn check_rules(config: &EffectiveConfig) -> Result<(), StrataError> {
    let min_sdk = config.get_integer("minSdkVersion")?.unwrap_or_default();
    let target_sdk = config.get_integer("targetSdkVersion")?.unwrap_or_default();
    let compile_sdk = config.get_integer("compileSdkVersion")?.unwrap_or_default();

    if min_sdk > target_sdk {
        return Err(StrataError::InvalidOption {
            option: "minSdkVersion".to_string(),
            message: format!("{min_sdk} is greater than targetSdkVersion {target_sdk}"),
        });
    }
    if target_sdk > compile_sdk {
        tracing::warn!(
            "{}: targetSdkVersion {target_sdk} is newer than compileSdkVersion {compile_sdk}",
            config.target()
        );
    }

    let minify = config.get_bool("minifyEnabled")?.unwrap_or(false);
    let shrink = config.get_bool("shrinkResources")?.unwrap_or(false);
    if shrink && !minify {
        return Err(StrataError::InvalidOption {
            option: "shrinkResources".to_string(),
            message: "resource shrinking requires minifyEnabled = true".to_string(),
        });
    }
    Ok(())
}
