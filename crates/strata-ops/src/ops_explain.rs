//! Operation: explain where an option's value comes from.

use serde::Serialize;

use strata_core::effective::ResolvedOption;
use strata_core::fragment::Layer;
use strata_core::value::{flatten, ConfigValue};
use strata_util::errors::StrataError;

use crate::{ProjectContext, TargetSelection};

/// A value some fragment assigns to the option (or below it).
#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub scope: String,
    pub layer: Option<Layer>,
    pub path: String,
    pub value: ConfigValue,
    /// Whether any of this value survives in the effective configuration.
    pub effective: bool,
}

/// How an option got its effective value.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub target: String,
    pub option: String,
    /// Effective leaves at or below the option path.
    pub resolved: Vec<(String, ResolvedOption)>,
    /// Every assignment in precedence order, finalize last.
    pub contributions: Vec<Contribution>,
}

pub fn explain(
    ctx: &ProjectContext,
    selection: &TargetSelection,
    option: &str,
) -> miette::Result<Explanation> {
    let (module, config) = ctx.resolve(selection)?;
    let variant = ctx.select_variant(&module, selection.variant.as_deref());
    let covers = |path: &str| path == option || path.starts_with(&format!("{option}."));

    let resolved: Vec<(String, ResolvedOption)> = config
        .iter()
        .filter(|(path, _)| covers(path))
        .map(|(path, opt)| (path.clone(), opt.clone()))
        .collect();

    let applicable = ctx.store.fragments_for(&module, variant.as_deref());
    let finalize = ctx.finalize.iter().map(|f| (f, None));
    let mut contributions = Vec::new();
    for (fragment, layer) in applicable
        .into_iter()
        .map(|f| (f, Some(f.layer)))
        .chain(finalize)
    {
        for (path, value) in flatten(&fragment.options) {
            if !covers(&path) {
                continue;
            }
            let effective = resolved
                .iter()
                .any(|(_, opt)| opt.sources.iter().any(|s| s == &fragment.scope));
            contributions.push(Contribution {
                scope: fragment.scope.clone(),
                layer,
                path,
                value: value.clone(),
                effective,
            });
        }
    }

    if resolved.is_empty() && contributions.is_empty() {
        return Err(StrataError::Generic {
            message: format!("option `{option}` is not set for {}", config.target()),
        }
        .into());
    }

    Ok(Explanation {
        target: config.target().to_string(),
        option: option.to_string(),
        resolved,
        contributions,
    })
}

/// Human-readable rendering.
pub fn render(explanation: &Explanation) -> String {
    let mut out = String::new();
    for (path, opt) in &explanation.resolved {
        out.push_str(&format!("{path} = {}\n", opt.value));
        let mut sources = opt.sources.clone();
        sources.dedup();
        out.push_str(&format!("  from {}\n", sources.join(", ")));
    }
    if !explanation.contributions.is_empty() {
        out.push_str("declared by:\n");
        for c in &explanation.contributions {
            let layer = c.layer.map_or("finalize".to_string(), |l| l.to_string());
            let marker = if c.effective { "" } else { " (overridden)" };
            out.push_str(&format!(
                "  {} [{layer}]: {} = {}{marker}\n",
                c.scope, c.path, c.value
            ));
        }
    }
    out
}
