//! Override engine: merges fragments into one effective configuration.
//!
//! Fragments are applied layer by layer (root, module, variant). Within one
//! layer the fragments are first combined among themselves, where
//! disagreement is an error unless declared ranks differ; the combined layer
//! is then laid over everything below it.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::effective::{EffectiveConfig, ResolvedOption};
use strata_core::fragment::ConfigFragment;
use strata_core::value::flatten;
use strata_util::errors::StrataError;

/// A leaf contributed by one layer.
#[derive(Debug, Clone)]
struct LayerLeaf {
    option: ResolvedOption,
    /// Scope that last wrote this leaf.
    owner: String,
    rank: i64,
    /// Replace root declared by the owning fragment, if any covers this leaf.
    replace_root: Option<String>,
}

impl LayerLeaf {
    fn extends(&self) -> bool {
        self.replace_root.is_none() && self.option.value.is_sequence()
    }
}

/// Merge fragments supplied in ascending precedence order.
///
/// Scalars are last-writer-wins across layers. Sequences are unioned unless
/// the higher fragment lists the option in its `replace` set. Two fragments
/// of the same layer assigning different values to one option fail with
/// `ConfigConflict` unless their ranks differ, in which case the higher rank
/// wins. The result does not depend on the order of fragments within a layer.
pub fn merge(target: &str, fragments: &[&ConfigFragment]) -> Result<EffectiveConfig, StrataError> {
    check_order(fragments)?;

    let mut config = EffectiveConfig::new(target);
    let mut start = 0;
    while start < fragments.len() {
        let layer = fragments[start].layer;
        let end = fragments[start..]
            .iter()
            .position(|f| f.layer != layer)
            .map_or(fragments.len(), |offset| start + offset);

        let mut group: Vec<&ConfigFragment> = fragments[start..end].to_vec();
        group.sort_by(|a, b| {
            a.effective_rank()
                .cmp(&b.effective_rank())
                .then_with(|| a.scope.cmp(&b.scope))
        });
        let leaves = merge_layer(&group)?;
        tracing::debug!(
            "{target}: applying {layer} layer ({} fragment(s), {} option(s))",
            group.len(),
            leaves.len()
        );
        apply_layer(&mut config, leaves);
        start = end;
    }
    Ok(config)
}

fn check_order(fragments: &[&ConfigFragment]) -> Result<(), StrataError> {
    for pair in fragments.windows(2) {
        if pair[1].layer < pair[0].layer {
            return Err(StrataError::Fragment {
                message: format!(
                    "fragments out of precedence order: `{}` ({}) follows `{}` ({})",
                    pair[1].scope, pair[1].layer, pair[0].scope, pair[0].layer
                ),
            });
        }
    }
    Ok(())
}

fn merge_layer(group: &[&ConfigFragment]) -> Result<BTreeMap<String, LayerLeaf>, StrataError> {
    let mut leaves: BTreeMap<String, LayerLeaf> = BTreeMap::new();

    for fragment in group {
        let rank = fragment.effective_rank();
        for (path, value) in flatten(&fragment.options) {
            let incoming = LayerLeaf {
                option: ResolvedOption::from_scope(value.clone(), &fragment.scope),
                owner: fragment.scope.clone(),
                rank,
                replace_root: fragment.replace_root_for(&path).map(str::to_string),
            };

            for clash in shape_clashes(&leaves, &path) {
                let existing = &leaves[&clash];
                if existing.rank == rank {
                    return Err(conflict(&path, &existing.owner, &fragment.scope));
                }
                leaves.remove(&clash);
            }

            match leaves.get_mut(&path) {
                None => {
                    leaves.insert(path, incoming);
                }
                Some(existing) if existing.extends() && incoming.extends() => {
                    existing.option.extend_unique(&incoming.option);
                    existing.owner = incoming.owner;
                    existing.rank = rank;
                }
                Some(existing) if existing.option.value == incoming.option.value => {}
                Some(existing) if existing.rank != rank => {
                    tracing::debug!(
                        "`{path}`: `{}` (rank {rank}) overrides `{}` (rank {})",
                        incoming.owner,
                        existing.owner,
                        existing.rank
                    );
                    *existing = incoming;
                }
                Some(existing) => {
                    return Err(conflict(&path, &existing.owner, &fragment.scope));
                }
            }
        }
    }
    Ok(leaves)
}

/// Leaves of the same layer that occupy an ancestor or descendant of `path`.
fn shape_clashes(leaves: &BTreeMap<String, LayerLeaf>, path: &str) -> Vec<String> {
    let child_prefix = format!("{path}.");
    leaves
        .keys()
        .filter(|key| key.starts_with(&child_prefix) || path.starts_with(&format!("{key}.")))
        .cloned()
        .collect()
}

fn conflict(path: &str, a: &str, b: &str) -> StrataError {
    let mut scopes = vec![a.to_string(), b.to_string()];
    scopes.sort();
    scopes.dedup();
    StrataError::ConfigConflict {
        option: path.to_string(),
        scopes,
    }
}

fn apply_layer(config: &mut EffectiveConfig, leaves: BTreeMap<String, LayerLeaf>) {
    let replace_roots: BTreeSet<&str> = leaves
        .values()
        .filter_map(|leaf| leaf.replace_root.as_deref())
        .collect();
    for root in replace_roots {
        let removed = config.remove_subtree(root);
        if removed > 0 {
            tracing::debug!("{}: `{root}` replaces {removed} inherited option(s)", config.target());
        }
    }

    for (path, leaf) in leaves {
        match config.option_mut(&path) {
            Some(existing) if leaf.extends() && existing.value.is_sequence() => {
                existing.extend_unique(&leaf.option);
            }
            _ => config.set(&path, leaf.option),
        }
    }
}

/// Lay a fragment over an existing configuration with override semantics:
/// every leaf it sets replaces what was there, sequences included.
pub fn overlay(config: &mut EffectiveConfig, fragment: &ConfigFragment) {
    for (path, value) in flatten(&fragment.options) {
        config.set(&path, ResolvedOption::from_scope(value.clone(), &fragment.scope));
    }
}
