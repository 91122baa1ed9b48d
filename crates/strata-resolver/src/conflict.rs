//! Reporting of libraries requested at more than one version.

use serde::Serialize;
use std::fmt;

/// Every library whose declarations disagreed before reconciliation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// A library requested with differing constraints that was still reconciled
/// to a single version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionConflict {
    pub library: String,
    /// Each distinct requirement paired with the scope that declared it.
    pub requested: Vec<(String, String)>,
    pub resolved: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requested: Vec<String> = self
            .requested
            .iter()
            .map(|(req, scope)| format!("{req} ({scope})"))
            .collect();
        write!(
            f,
            "{}: requested {} -> resolved {}",
            self.library,
            requested.join(", "),
            self.resolved
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = ConflictReport::new();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "No version conflicts.");
    }

    #[test]
    fn report_with_conflicts() {
        let mut report = ConflictReport::new();
        report.add(VersionConflict {
            library: "org.example:lib".to_string(),
            requested: vec![
                (">=1.0,<2.0".to_string(), "root".to_string()),
                (">=1.5".to_string(), "app".to_string()),
            ],
            resolved: "1.9".to_string(),
        });
        assert_eq!(report.len(), 1);
        let s = report.to_string();
        assert!(s.starts_with("Version conflicts (1):"));
        assert!(s.contains("org.example:lib: requested >=1.0,<2.0 (root), >=1.5 (app) -> resolved 1.9"));
    }
}
