//! Operation: reconcile the dependencies of a target.

use strata_core::dependency::dependencies_from;
use strata_resolver::reconcile::{constraints_from, resolve, Resolution};

use crate::{ProjectContext, TargetSelection};

pub fn deps(ctx: &ProjectContext, selection: &TargetSelection) -> miette::Result<Resolution> {
    let (_, config) = ctx.resolve(selection)?;
    let decls = dependencies_from(&config)?;
    let constraints = constraints_from(&decls, &ctx.manifest.registry)?;
    tracing::debug!(
        "{}: {} declaration(s), {} constraint(s)",
        config.target(),
        decls.len(),
        constraints.len()
    );
    Ok(resolve(&constraints, &ctx.manifest.registry)?)
}

/// `group:artifact:version (scope)` per library.
pub fn render(resolution: &Resolution) -> String {
    let mut out = String::new();
    for dep in resolution.resolved.values() {
        out.push_str(&format!("{}:{} ({})\n", dep.library, dep.version, dep.scope));
    }
    out
}
