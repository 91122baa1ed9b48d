//! Resolution of one build target, from the fragment store to a finished
//! effective configuration.

use strata_core::effective::EffectiveConfig;
use strata_core::fragment::{ConfigFragment, FragmentStore};
use strata_core::layout::OutputLayout;
use strata_util::errors::StrataError;

use crate::merge::merge;
use crate::transform::finish;

/// Name of a target: `module` or `module/variant`.
pub fn target_name(module: &str, variant: Option<&str>) -> String {
    match variant {
        Some(v) => format!("{module}/{v}"),
        None => module.to_string(),
    }
}

/// Merge every fragment that applies to `module` (and `variant`) and run
/// the post-merge passes.
pub fn resolve_target(
    store: &FragmentStore,
    finalize: Option<&ConfigFragment>,
    layout: &OutputLayout,
    module: &str,
    variant: Option<&str>,
) -> Result<EffectiveConfig, StrataError> {
    if !store.modules().contains(&module) {
        return Err(StrataError::Generic {
            message: format!("unknown module `{module}`"),
        });
    }
    if let Some(v) = variant {
        if !store.variants(module).contains(&v) {
            return Err(StrataError::Generic {
                message: format!("module `{module}` has no variant `{v}`"),
            });
        }
    }

    let name = target_name(module, variant);
    let fragments = store.fragments_for(module, variant);
    tracing::debug!(
        "resolving {name} from {} fragment(s): {}",
        fragments.len(),
        fragments
            .iter()
            .map(|f| f.scope.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut config = merge(&name, &fragments)?;
    finish(&mut config, finalize, layout, module)?;
    Ok(config)
}
