//! Version parsing, comparison, and requirement matching.
//!
//! Versions use Maven-style ordering rather than semver:
//! - Segments are split on `.` and `-`
//! - Numeric segments compare as numbers
//! - String qualifiers have a special ordering:
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`
//! - Trailing zero segments are insignificant (`1.0 == 1.0.0`)
//!
//! Requirements accept comparator lists (`>=1.0,<2.0`, `=1.5`), Maven ranges
//! (`[1.0,2.0)`, `[1.5]`), prefix versions (`1.+`), `*`, and bare versions,
//! which require that exact version.

use std::cmp::Ordering;
use std::fmt;

use strata_util::errors::StrataError;

/// A parsed version with comparable segments.
#[derive(Debug, Clone)]
pub struct Version {
    pub original: String,
    segments: Vec<Segment>,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

/// Well-known qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl Version {
    pub fn parse(version: &str) -> Self {
        let segments = parse_segments(version);
        Self {
            original: version.to_string(),
            segments,
        }
    }

    /// Parse, rejecting text that cannot be a version.
    pub fn parse_strict(version: &str) -> Result<Self, StrataError> {
        let v = version.trim();
        let valid = !v.is_empty()
            && v.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && v
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(StrataError::Version {
                input: version.to_string(),
                message: "expected a version such as 1.2.3 or 31.0-jre".to_string(),
            });
        }
        Ok(Self::parse(v))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let a = self.segments.get(i);
            let b = other.segments.get(i);
            let ord = compare_segments(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(s) if s.is_empty() => Ordering::Equal,
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Qualifier(_)) => Ordering::Greater,
        (Segment::Qualifier(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for ch in version.chars() {
        if ch == '.' || ch == '-' {
            if !current.is_empty() {
                segments.push(classify(&current));
                current.clear();
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        segments.push(classify(&current));
    }

    segments
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "" | "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

/// Comparison operator of a single requirement clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

/// One clause of a requirement: `op version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

impl Comparator {
    pub fn matches(&self, v: &Version) -> bool {
        let ord = v.cmp(&self.version);
        match self.op {
            Op::Exact => ord == Ordering::Equal,
            Op::Greater => ord == Ordering::Greater,
            Op::GreaterEq => ord != Ordering::Less,
            Op::Less => ord == Ordering::Less,
            Op::LessEq => ord != Ordering::Greater,
        }
    }

    /// Whether the clause names a version that itself satisfies it.
    fn is_inclusive(&self) -> bool {
        matches!(self.op, Op::Exact | Op::GreaterEq | Op::LessEq)
    }
}

/// A conjunction of comparators. No comparators means any version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    raw: String,
    comparators: Vec<Comparator>,
}

impl VersionReq {
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            comparators: Vec::new(),
        }
    }

    /// Exactly `version`.
    pub fn exact(version: &str) -> Result<Self, StrataError> {
        Ok(Self {
            raw: format!("={version}"),
            comparators: vec![Comparator {
                op: Op::Exact,
                version: Version::parse_strict(version)?,
            }],
        })
    }

    pub fn parse(spec: &str) -> Result<Self, StrataError> {
        let s = spec.trim();
        if s.is_empty() || s == "*" || s == "+" {
            return Ok(Self::any());
        }
        let comparators = if s.starts_with('[') || s.starts_with('(') {
            let range = VersionRange::parse(s).ok_or_else(|| StrataError::Version {
                input: spec.to_string(),
                message: "malformed version range".to_string(),
            })?;
            range.into_comparators()
        } else {
            let mut out = Vec::new();
            for clause in s.split(',') {
                out.extend(parse_clause(clause.trim(), spec)?);
            }
            out
        };
        Ok(Self {
            raw: s.to_string(),
            comparators,
        })
    }

    pub fn matches(&self, v: &Version) -> bool {
        self.comparators.iter().all(|c| c.matches(v))
    }

    pub fn is_any(&self) -> bool {
        self.comparators.is_empty()
    }

    /// Versions named by inclusive clauses; these are resolution candidates
    /// even when the registry doesn't list them.
    pub fn named_versions(&self) -> impl Iterator<Item = &Version> {
        self.comparators
            .iter()
            .filter(|c| c.is_inclusive())
            .map(|c| &c.version)
    }

    /// The pinned version, when the requirement is a single exact clause.
    pub fn exact_version(&self) -> Option<&Version> {
        match self.comparators.as_slice() {
            [Comparator { op: Op::Exact, version }] => Some(version),
            _ => None,
        }
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_clause(clause: &str, whole: &str) -> Result<Vec<Comparator>, StrataError> {
    if clause.is_empty() {
        return Err(StrataError::Version {
            input: whole.to_string(),
            message: "empty clause".to_string(),
        });
    }
    let (op, rest) = if let Some(r) = clause.strip_prefix(">=") {
        (Op::GreaterEq, r)
    } else if let Some(r) = clause.strip_prefix("<=") {
        (Op::LessEq, r)
    } else if let Some(r) = clause.strip_prefix("==") {
        (Op::Exact, r)
    } else if let Some(r) = clause.strip_prefix('>') {
        (Op::Greater, r)
    } else if let Some(r) = clause.strip_prefix('<') {
        (Op::Less, r)
    } else if let Some(r) = clause.strip_prefix('=') {
        (Op::Exact, r)
    } else if let Some(prefix) = clause.strip_suffix(".+") {
        return prefix_clause(prefix, whole);
    } else {
        (Op::Exact, clause)
    };
    let version = Version::parse_strict(rest.trim()).map_err(|_| StrataError::Version {
        input: whole.to_string(),
        message: format!("`{clause}` does not name a valid version"),
    })?;
    Ok(vec![Comparator { op, version }])
}

/// `1.2.+` means `>=1.2, <1.3`.
fn prefix_clause(prefix: &str, whole: &str) -> Result<Vec<Comparator>, StrataError> {
    let lower = Version::parse_strict(prefix).map_err(|_| StrataError::Version {
        input: whole.to_string(),
        message: format!("`{prefix}.+` has an invalid prefix"),
    })?;
    let (head, last) = match prefix.rsplit_once('.') {
        Some((head, last)) => (Some(head), last),
        None => (None, prefix),
    };
    let next = last
        .parse::<u64>()
        .map_err(|_| StrataError::Version {
            input: whole.to_string(),
            message: "the segment before `.+` must be numeric".to_string(),
        })?
        .checked_add(1)
        .ok_or_else(|| StrataError::Version {
            input: whole.to_string(),
            message: format!("`{last}.+` has no upper bound"),
        })?;
    let upper = match head {
        Some(head) => format!("{head}.{next}"),
        None => next.to_string(),
    };
    Ok(vec![
        Comparator {
            op: Op::GreaterEq,
            version: lower,
        },
        Comparator {
            op: Op::Less,
            version: Version::parse(&upper),
        },
    ])
}

/// A Maven version range expression.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.5]` (exact).
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse a Maven version range string.
    ///
    /// Returns `None` for bare versions and malformed ranges.
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        if !s.starts_with('[') && !s.starts_with('(') {
            return None;
        }
        if s.len() < 2 || !(s.ends_with(']') || s.ends_with(')')) {
            return None;
        }

        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        if let Some((lower, upper)) = inner.split_once(',') {
            let lower = lower.trim();
            let upper = upper.trim();
            if upper.contains(',') {
                return None;
            }
            Some(VersionRange {
                lower: if lower.is_empty() {
                    None
                } else {
                    Some(Bound {
                        version: Version::parse_strict(lower).ok()?,
                        inclusive: open_inclusive,
                    })
                },
                upper: if upper.is_empty() {
                    None
                } else {
                    Some(Bound {
                        version: Version::parse_strict(upper).ok()?,
                        inclusive: close_inclusive,
                    })
                },
            })
        } else {
            if !(open_inclusive && close_inclusive) {
                return None;
            }
            // Exact version: [1.0] means exactly 1.0
            let v = Version::parse_strict(inner.trim()).ok()?;
            Some(VersionRange {
                lower: Some(Bound {
                    version: v.clone(),
                    inclusive: true,
                }),
                upper: Some(Bound {
                    version: v,
                    inclusive: true,
                }),
            })
        }
    }

    fn into_comparators(self) -> Vec<Comparator> {
        if let (Some(lo), Some(hi)) = (&self.lower, &self.upper) {
            if lo.inclusive && hi.inclusive && lo.version == hi.version {
                return vec![Comparator {
                    op: Op::Exact,
                    version: lo.version.clone(),
                }];
            }
        }
        let mut out = Vec::new();
        if let Some(lo) = self.lower {
            out.push(Comparator {
                op: if lo.inclusive { Op::GreaterEq } else { Op::Greater },
                version: lo.version,
            });
        }
        if let Some(hi) = self.upper {
            out.push(Comparator {
                op: if hi.inclusive { Op::LessEq } else { Op::Less },
                version: hi.version,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s)
    }

    #[test]
    fn basic_ordering() {
        assert!(v("1.0") < v("2.0"));
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.1.0"));
        assert!(v("1.9") < v("1.10"));
    }

    #[test]
    fn qualifier_ordering() {
        assert!(v("1.0-alpha") < v("1.0-beta"));
        assert!(v("1.0-beta") < v("1.0-rc"));
        assert!(v("1.0-rc") < v("1.0"));
        assert!(v("1.0") < v("1.0-sp"));
        assert!(v("1.0-SNAPSHOT") < v("1.0"));
    }

    #[test]
    fn trailing_zeros_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
    }

    #[test]
    fn guava_style_versions() {
        assert!(v("31.0-jre") < v("32.0-jre"));
        assert!(v("1.0.0") > v("1.0.0-jre"));
    }

    #[test]
    fn strict_parse_rejects_garbage() {
        assert!(Version::parse_strict("").is_err());
        assert!(Version::parse_strict(">=1.0").is_err());
        assert!(Version::parse_strict("1.0 beta").is_err());
        assert!(Version::parse_strict("2.0.4").is_ok());
    }

    #[test]
    fn comparator_list() {
        let req = VersionReq::parse(">=1.0,<2.0").unwrap();
        assert!(req.matches(&v("1.0")));
        assert!(req.matches(&v("1.9.9")));
        assert!(!req.matches(&v("2.0")));
        assert!(!req.matches(&v("0.9")));
        let named: Vec<String> = req.named_versions().map(|v| v.to_string()).collect();
        assert_eq!(named, vec!["1.0"]);
    }

    #[test]
    fn bare_version_is_exact() {
        let req = VersionReq::parse("2.0.4").unwrap();
        assert_eq!(req.exact_version().map(|v| v.to_string()).as_deref(), Some("2.0.4"));
        assert!(!req.matches(&v("2.0.5")));
    }

    #[test]
    fn wildcard_matches_everything() {
        let req = VersionReq::parse("*").unwrap();
        assert!(req.is_any());
        assert!(req.matches(&v("0.0.1")));
        assert!(VersionReq::parse("").unwrap().is_any());
    }

    #[test]
    fn prefix_versions() {
        let req = VersionReq::parse("1.2.+").unwrap();
        assert!(req.matches(&v("1.2")));
        assert!(req.matches(&v("1.2.9")));
        assert!(!req.matches(&v("1.3")));
        let req = VersionReq::parse("3.+").unwrap();
        assert!(req.matches(&v("3.99")));
        assert!(!req.matches(&v("4.0")));
    }

    #[test]
    fn maven_ranges() {
        let req = VersionReq::parse("[1.0,2.0)").unwrap();
        assert!(req.matches(&v("1.0")));
        assert!(!req.matches(&v("2.0")));

        let req = VersionReq::parse("(,2.0]").unwrap();
        assert!(req.matches(&v("2.0")));
        assert!(!req.matches(&v("2.0.1")));

        let req = VersionReq::parse("[1.5]").unwrap();
        assert!(req.exact_version().is_some());
        assert!(req.matches(&v("1.5.0")));
    }

    #[test]
    fn malformed_requirements_rejected() {
        assert!(VersionReq::parse(">=").is_err());
        assert!(VersionReq::parse(">=1.0,").is_err());
        assert!(VersionReq::parse("[1.0,2.0").is_err());
        assert!(VersionReq::parse("(1.5)").is_err());
        assert!(VersionReq::parse("[1,2),[3,4)").is_err());
        assert!(VersionReq::parse("x.+").is_err());
        assert!(matches!(
            VersionReq::parse("18446744073709551615.+"),
            Err(StrataError::Version { .. })
        ));
    }
}
