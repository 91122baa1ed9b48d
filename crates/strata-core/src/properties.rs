use std::collections::BTreeMap;
use std::path::Path;

/// Loads a `.strata.env` file (shell-style `KEY=value` format).
///
/// `.strata.env` holds values that should stay out of version control
/// (signing passwords, CI tokens). They are available via `${env:VAR}`
/// interpolation in `Strata.toml`.
pub fn load_env_file(path: &Path) -> miette::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if !path.is_file() {
        return Ok(map);
    }
    let content = std::fs::read_to_string(path).map_err(strata_util::errors::StrataError::Io)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        if let Some((key, value)) = trimmed.split_once('=') {
            map.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }
    Ok(map)
}

/// Loads a Java-style `local.properties` file.
///
/// Accepts `key=value` and `key: value`; lines starting with `#` or `!` are
/// comments. Host toolchains write machine-specific values here (SDK paths,
/// version codes), which `${prop:key}` makes available to the build definition.
pub fn load_properties(path: &Path) -> miette::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if !path.is_file() {
        return Ok(map);
    }
    let content = std::fs::read_to_string(path).map_err(strata_util::errors::StrataError::Io)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let split = trimmed
            .find(['=', ':'])
            .map(|i| (&trimmed[..i], &trimmed[i + 1..]));
        if let Some((key, value)) = split {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(map)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Interpolate `${env:VAR}` and `${prop:key}` references in a string.
///
/// `${env:VAR}` looks in `env_overrides` (from `.strata.env`) first, then the
/// process environment. `${prop:key}` looks in `properties` only. Unknown keys
/// expand to the empty string; other `${...}` forms are left as written.
/// Substituted text is not rescanned.
pub fn interpolate(
    input: &str,
    env_overrides: &BTreeMap<String, String>,
    properties: &BTreeMap<String, String>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let reference = &rest[start + 2..start + len];
        let value = if let Some(key) = reference.strip_prefix("env:") {
            Some(
                env_overrides
                    .get(key)
                    .cloned()
                    .or_else(|| std::env::var(key).ok())
                    .unwrap_or_default(),
            )
        } else if let Some(key) = reference.strip_prefix("prop:") {
            if !properties.contains_key(key) {
                tracing::warn!("property `{key}` is not defined in local.properties");
            }
            Some(properties.get(key).cloned().unwrap_or_default())
        } else {
            None
        };
        match value {
            Some(v) => {
                result.push_str(&rest[..start]);
                result.push_str(&v);
            }
            None => result.push_str(&rest[..=start + len]),
        }
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}
