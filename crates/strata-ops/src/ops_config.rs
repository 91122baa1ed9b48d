//! Operation: show the effective configuration of a target.

use strata_core::effective::EffectiveConfig;

use crate::{ProjectContext, TargetSelection};

/// Resolve the effective configuration of the selected target.
pub fn config(ctx: &ProjectContext, selection: &TargetSelection) -> miette::Result<EffectiveConfig> {
    let (_, config) = ctx.resolve(selection)?;
    Ok(config)
}

/// One `path = value` line per option, with the supplying scopes.
pub fn render(config: &EffectiveConfig) -> String {
    let mut out = String::new();
    for (path, option) in config.iter() {
        let mut sources = option.sources.clone();
        sources.dedup();
        out.push_str(&format!("{path} = {}  # {}\n", option.value, sources.join(", ")));
    }
    out
}

/// JSON document of the configuration, re-nested, plus per-option sources.
pub fn to_json(config: &EffectiveConfig) -> miette::Result<String> {
    let sources: std::collections::BTreeMap<&str, &[String]> = config
        .iter()
        .map(|(path, option)| (path.as_str(), option.sources.as_slice()))
        .collect();
    let doc = serde_json::json!({
        "target": config.target(),
        "options": config.to_value(),
        "sources": sources,
    });
    serde_json::to_string_pretty(&doc).map_err(|e| {
        strata_util::errors::StrataError::Generic {
            message: format!("Failed to serialize configuration: {e}"),
        }
        .into()
    })
}
