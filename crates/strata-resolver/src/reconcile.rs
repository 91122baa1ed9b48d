//! Dependency reconciliation: one version per library from every declared
//! constraint.
//!
//! Resolution is offline. Candidate versions come from the `[registry]` and
//! from versions the constraints name themselves; the highest candidate that
//! satisfies every constraint wins.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use strata_core::dependency::{DependencyDecl, DependencyScope};
use strata_core::registry::Registry;
use strata_util::errors::StrataError;

use crate::conflict::{ConflictReport, VersionConflict};
use crate::version::{Version, VersionReq};

/// A single requirement on a library, tagged with who declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyConstraint {
    /// `group:artifact`
    pub library: String,
    pub req: VersionReq,
    pub declared_by: String,
    pub scope: DependencyScope,
}

impl DependencyConstraint {
    pub fn new(
        library: impl Into<String>,
        req: &str,
        declared_by: impl Into<String>,
    ) -> Result<Self, StrataError> {
        Ok(Self {
            library: library.into(),
            req: VersionReq::parse(req)?,
            declared_by: declared_by.into(),
            scope: DependencyScope::Compile,
        })
    }
}

/// The version chosen for one library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    pub library: String,
    pub version: String,
    /// Widest classpath scope among the declarations.
    pub scope: DependencyScope,
    /// Every scope that declared a constraint, sorted.
    pub declared_by: Vec<String>,
}

/// Outcome of reconciling a set of constraints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    pub resolved: BTreeMap<String, ResolvedDependency>,
    pub conflicts: ConflictReport,
}

impl Resolution {
    pub fn version_of(&self, library: &str) -> Option<&str> {
        self.resolved.get(library).map(|d| d.version.as_str())
    }
}

/// Turn declarations into constraints, expanding platforms into the
/// versions they pin.
///
/// A platform only constrains libraries that some other declaration names;
/// the rest of its pins never become dependencies.
pub fn constraints_from(
    decls: &[DependencyDecl],
    registry: &Registry,
) -> Result<Vec<DependencyConstraint>, StrataError> {
    let declared: BTreeSet<String> = decls
        .iter()
        .filter(|d| !d.platform)
        .map(|d| d.coordinate.to_string())
        .collect();

    let mut out = Vec::new();
    for decl in decls {
        let library = decl.coordinate.to_string();
        if decl.platform {
            let version = platform_version(decl, registry)?;
            let pins = registry
                .platform(&library, &version)
                .ok_or_else(|| StrataError::UnsatisfiableConstraint {
                    library: format!("{library}:{version}"),
                    scopes: vec![decl.declared_by.clone()],
                })?;
            let declared_by = format!("{} (platform {library}:{version})", decl.declared_by);
            tracing::debug!("platform {library}:{version} pins {} version(s)", pins.len());
            for (pinned, pinned_version) in pins {
                if !declared.contains(pinned) {
                    continue;
                }
                out.push(DependencyConstraint {
                    library: pinned.clone(),
                    req: VersionReq::exact(pinned_version)?,
                    declared_by: declared_by.clone(),
                    scope: decl.scope,
                });
            }
            continue;
        }
        let req = match &decl.version {
            Some(v) => VersionReq::parse(v)?,
            None => VersionReq::any(),
        };
        out.push(DependencyConstraint {
            library,
            req,
            declared_by: decl.declared_by.clone(),
            scope: decl.scope,
        });
    }
    Ok(out)
}

/// The platform version a declaration refers to: its own exact version, or
/// the highest one the registry knows when it names none.
fn platform_version(decl: &DependencyDecl, registry: &Registry) -> Result<String, StrataError> {
    let library = decl.coordinate.to_string();
    let req = match &decl.version {
        Some(v) => VersionReq::parse(v)?,
        None => VersionReq::any(),
    };
    if let Some(exact) = req.exact_version() {
        return Ok(exact.original.clone());
    }
    registry
        .platform_versions(&library)
        .into_iter()
        .map(Version::parse)
        .filter(|v| req.matches(v))
        .max()
        .map(|v| v.original)
        .ok_or_else(|| StrataError::UnsatisfiableConstraint {
            library,
            scopes: vec![decl.declared_by.clone()],
        })
}

/// Pick one version per library.
///
/// Deterministic: constraints are put into a canonical order first, so the
/// input order never affects the result or the reported scopes.
pub fn resolve(
    constraints: &[DependencyConstraint],
    registry: &Registry,
) -> Result<Resolution, StrataError> {
    let mut by_library: BTreeMap<&str, Vec<&DependencyConstraint>> = BTreeMap::new();
    for c in constraints {
        by_library.entry(c.library.as_str()).or_default().push(c);
    }

    let mut resolution = Resolution::default();
    for (library, mut group) in by_library {
        group.sort_by(|a, b| {
            a.declared_by
                .cmp(&b.declared_by)
                .then_with(|| a.req.to_string().cmp(&b.req.to_string()))
        });

        let candidates = candidates(library, &group, registry);
        let Some(chosen) = candidates
            .iter()
            .find(|v| group.iter().all(|c| c.req.matches(v)))
        else {
            return Err(StrataError::UnsatisfiableConstraint {
                library: library.to_string(),
                scopes: blame(&group, &candidates),
            });
        };
        tracing::debug!(
            "{library}: {} constraint(s), {} candidate(s), chose {chosen}",
            group.len(),
            candidates.len()
        );

        if let Some(conflict) = conflict_for(library, &group, chosen) {
            resolution.conflicts.add(conflict);
        }

        let mut declared_by: Vec<String> = group.iter().map(|c| c.declared_by.clone()).collect();
        declared_by.dedup();
        let scope = group
            .iter()
            .map(|c| c.scope)
            .min()
            .unwrap_or_default();
        resolution.resolved.insert(
            library.to_string(),
            ResolvedDependency {
                library: library.to_string(),
                version: chosen.original.clone(),
                scope,
                declared_by,
            },
        );
    }
    Ok(resolution)
}

/// Candidate versions, highest first. Versions named by the constraints come
/// before registry spellings of the same version, so `1.0` requested stays
/// `1.0` even if the registry lists `1.0.0`.
fn candidates(library: &str, group: &[&DependencyConstraint], registry: &Registry) -> Vec<Version> {
    let mut out: Vec<Version> = group
        .iter()
        .flat_map(|c| c.req.named_versions().cloned())
        .collect();
    for raw in registry.versions(library) {
        match Version::parse_strict(raw) {
            Ok(v) => out.push(v),
            Err(_) => tracing::warn!("registry lists malformed version `{raw}` for {library}"),
        }
    }
    out.sort_by(|a, b| b.cmp(a));
    out.dedup_by(|later, earlier| later == earlier);
    out
}

/// Scopes to name when nothing satisfies a library's constraints: the first
/// pair that no candidate satisfies together, otherwise every declaring scope.
fn blame(group: &[&DependencyConstraint], candidates: &[Version]) -> Vec<String> {
    for (i, a) in group.iter().enumerate() {
        for b in &group[i + 1..] {
            if !candidates
                .iter()
                .any(|v| a.req.matches(v) && b.req.matches(v))
            {
                return sorted_scopes([*a, *b].into_iter());
            }
        }
    }
    sorted_scopes(group.iter().copied())
}

fn sorted_scopes<'a>(constraints: impl Iterator<Item = &'a DependencyConstraint>) -> Vec<String> {
    let mut scopes: Vec<String> = constraints.map(|c| c.declared_by.clone()).collect();
    scopes.sort();
    scopes.dedup();
    scopes
}

fn conflict_for(
    library: &str,
    group: &[&DependencyConstraint],
    chosen: &Version,
) -> Option<VersionConflict> {
    let explicit: Vec<&&DependencyConstraint> = group.iter().filter(|c| !c.req.is_any()).collect();
    let first = explicit.first()?;
    if explicit.iter().all(|c| c.req == first.req) {
        return None;
    }
    Some(VersionConflict {
        library: library.to_string(),
        requested: explicit
            .iter()
            .map(|c| (c.req.to_string(), c.declared_by.clone()))
            .collect(),
        resolved: chosen.original.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::registry::LibraryEntry;

    fn registry(library: &str, versions: &[&str]) -> Registry {
        let mut registry = Registry::default();
        registry.libraries.insert(
            library.to_string(),
            LibraryEntry {
                versions: versions.iter().map(|v| v.to_string()).collect(),
            },
        );
        registry
    }

    fn c(req: &str, scope: &str) -> DependencyConstraint {
        DependencyConstraint::new("org.example:lib", req, scope).unwrap()
    }

    #[test]
    fn highest_version_satisfying_all() {
        let registry = registry("org.example:lib", &["1.0", "1.5", "1.9", "2.0"]);
        let resolution = resolve(&[c(">=1.0,<2.0", "root"), c(">=1.5", "app")], &registry).unwrap();
        let dep = &resolution.resolved["org.example:lib"];
        assert_eq!(dep.version, "1.9");
        assert_eq!(dep.declared_by, vec!["app", "root"]);
        assert_eq!(resolution.conflicts.len(), 1);
    }

    #[test]
    fn disjoint_exact_requirements_are_unsatisfiable() {
        let err = resolve(&[c("=1.0", "root"), c("=2.0", "app")], &Registry::default()).unwrap_err();
        match err {
            StrataError::UnsatisfiableConstraint { library, scopes } => {
                assert_eq!(library, "org.example:lib");
                assert_eq!(scopes, vec!["app", "root"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blame_names_the_incompatible_pair() {
        let registry = registry("org.example:lib", &["1.0", "2.0", "3.0"]);
        let err = resolve(
            &[c("*", "a"), c("<2.0", "b"), c(">=3.0", "c")],
            &registry,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StrataError::UnsatisfiableConstraint { ref scopes, .. } if scopes == &["b", "c"]
        ));
    }

    #[test]
    fn result_independent_of_input_order() {
        let registry = registry("org.example:lib", &["1.0", "1.2", "1.4"]);
        let constraints = vec![c("[1.0,1.4)", "root"), c(">=1.1", "app"), c("*", "lib")];
        let forward = resolve(&constraints, &registry).unwrap();
        let mut reversed = constraints.clone();
        reversed.reverse();
        let backward = resolve(&reversed, &registry).unwrap();
        assert_eq!(forward.resolved, backward.resolved);
        assert_eq!(forward.version_of("org.example:lib"), Some("1.2"));
    }

    #[test]
    fn single_exact_constraint_keeps_its_spelling() {
        let registry = registry("org.example:lib", &["1.0.0"]);
        let resolution = resolve(&[c("1.0", "app")], &registry).unwrap();
        assert_eq!(resolution.version_of("org.example:lib"), Some("1.0"));
        assert!(resolution.conflicts.is_empty());
    }

    #[test]
    fn widest_scope_wins() {
        let mut test_only = c("1.0", "app");
        test_only.scope = DependencyScope::Test;
        let mut runtime = c("1.0", "lib");
        runtime.scope = DependencyScope::Runtime;
        let resolution = resolve(&[test_only, runtime], &Registry::default()).unwrap();
        assert_eq!(resolution.resolved["org.example:lib"].scope, DependencyScope::Runtime);
    }
}
