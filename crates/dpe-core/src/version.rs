//! Version comparison.
//!
//! Versions are split into components on `.`, `_`, `-` and `+`, and on every
//! boundary between a digit and a non-digit character. Components compare
//! pairwise: numbers by value, release-stage keywords by the fixed order
//!
//! `dev < alpha = a < beta = b < RC = rc < (number) < pl = p`
//!
//! and anything else lexically. Missing trailing components count as `0`,
//! except under the approximate operator `~`, where the shorter version acts
//! as a wildcard prefix.

use crate::error::VersionError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Rank of a bare number in the release-stage order
const NUMBER_RANK: u8 = 4;

/// Relational operator for [`satisfies`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=` / `==`
    Eq,
    /// `!=` / `<>`
    Ne,
    /// `~` / `~=`: equal on the common prefix
    Approx,
}

impl CompareOp {
    /// True if `ordering` (of left against right) satisfies the operator.
    ///
    /// [`CompareOp::Approx`] behaves like [`CompareOp::Eq`] here; its prefix
    /// semantics live in [`satisfies`].
    #[must_use]
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Eq | Self::Approx => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
        }
    }

    /// Splits a leading operator off `s`, e.g. `">=8.1"` into `(Ge, "8.1")`
    #[must_use]
    pub fn strip_prefix(s: &str) -> Option<(Self, &str)> {
        const PREFIXES: [(&str, CompareOp); 9] = [
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("~=", CompareOp::Approx),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
            ("=", CompareOp::Eq),
            ("~", CompareOp::Approx),
        ];
        PREFIXES
            .iter()
            .find_map(|(prefix, op)| s.strip_prefix(prefix).map(|rest| (*op, rest)))
    }

    /// Canonical symbol
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Approx => "~",
        }
    }
}

impl FromStr for CompareOp {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" | "lt" => Ok(Self::Lt),
            "<=" | "le" => Ok(Self::Le),
            ">" | "gt" => Ok(Self::Gt),
            ">=" | "ge" => Ok(Self::Ge),
            "=" | "==" | "eq" => Ok(Self::Eq),
            "!=" | "<>" | "ne" => Ok(Self::Ne),
            "~" | "~=" => Ok(Self::Approx),
            other => Err(VersionError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Splits a version into its components.
///
/// `1.2.3-beta1` becomes `["1", "2", "3", "beta", "1"]`.
#[must_use]
pub fn components(version: &str) -> Vec<String> {
    fn flush(current: &mut String, parts: &mut Vec<String>) {
        if !current.is_empty() {
            parts.push(std::mem::take(current));
        }
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for c in version.chars() {
        if matches!(c, '.' | '_' | '-' | '+') {
            flush(&mut current, &mut parts);
            continue;
        }
        if current
            .chars()
            .last()
            .is_some_and(|last| last.is_ascii_digit() != c.is_ascii_digit())
        {
            flush(&mut current, &mut parts);
        }
        current.push(c);
    }
    flush(&mut current, &mut parts);
    parts
}

/// Rewrites a version as dot-separated components, e.g. `1.2.3.beta.1`
#[must_use]
pub fn normalize(version: &str) -> String {
    components(version).join(".")
}

fn is_numeric(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

fn rank(part: &str) -> Option<u8> {
    if is_numeric(part) {
        return Some(NUMBER_RANK);
    }
    match part {
        "dev" => Some(0),
        "alpha" | "a" => Some(1),
        "beta" | "b" => Some(2),
        "RC" | "rc" => Some(3),
        "pl" | "p" => Some(5),
        _ => None,
    }
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_component(a: &str, b: &str) -> Ordering {
    if is_numeric(a) && is_numeric(b) {
        return compare_numeric(a, b);
    }
    match (rank(a), rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Compares two versions
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let ca = components(a);
    let cb = components(b);
    let len = ca.len().max(cb.len());
    (0..len)
        .map(|i| {
            compare_component(
                ca.get(i).map_or("0", String::as_str),
                cb.get(i).map_or("0", String::as_str),
            )
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Compares two versions and returns -1, 0 or 1
#[must_use]
pub fn compare_sign(a: &str, b: &str) -> i32 {
    match compare(a, b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// True if `a op b` holds
#[must_use]
pub fn satisfies(a: &str, op: CompareOp, b: &str) -> bool {
    if op != CompareOp::Approx {
        return op.holds(compare(a, b));
    }
    // Exhausting either side before a difference means prefix-compatible
    let ca = components(a);
    let cb = components(b);
    ca.iter()
        .zip(&cb)
        .all(|(x, y)| compare_component(x, y).is_eq())
}

/// Stable sort of `versions`
pub fn sort<S: AsRef<str>>(versions: &mut [S], newest_first: bool) {
    versions.sort_by(|a, b| {
        let ordering = compare(a.as_ref(), b.as_ref());
        if newest_first {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn sorted_desc<S: AsRef<str>>(versions: &[S]) -> Vec<String> {
    let mut sorted: Vec<String> = versions.iter().map(|v| v.as_ref().to_string()).collect();
    sort(&mut sorted, true);
    sorted
}

/// Keeps the newest version for each distinct prefix of `level` components,
/// newest first.
///
/// # Errors
///
/// [`VersionError::TooFewComponents`] if a version is shorter than `level`.
pub fn latest_versions_with_level<S: AsRef<str>>(
    versions: &[S],
    level: usize,
) -> Result<Vec<String>, VersionError> {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut latest = Vec::new();
    for version in sorted_desc(versions) {
        let mut parts = components(&version);
        if parts.len() < level {
            return Err(VersionError::TooFewComponents { version, required: level });
        }
        parts.truncate(level);
        if seen.insert(parts) {
            latest.push(version);
        }
    }
    Ok(latest)
}

/// Keeps the newest patch release of each `major.minor` branch.
///
/// # Errors
///
/// [`VersionError::TooFewComponents`] if a version has no minor component.
pub fn latest_patch_versions<S: AsRef<str>>(versions: &[S]) -> Result<Vec<String>, VersionError> {
    latest_versions_with_level(versions, 2)
}

/// Ordered mapping from a version to its image tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTags(Vec<(String, Vec<String>)>);

impl VersionTags {
    /// Tags for `version`
    #[must_use]
    pub fn get(&self, version: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, tags)| tags.as_slice())
    }

    /// Entries, newest version first
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(v, t)| (v.as_str(), t.as_slice()))
    }

    /// Number of versions
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no versions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies `f` to every tag
    #[must_use]
    pub fn map_tags(self, mut f: impl FnMut(&str) -> String) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|(v, tags)| {
                    let tags = tags.iter().map(|t| f(t.as_str())).collect();
                    (v, tags)
                })
                .collect(),
        )
    }
}

impl Serialize for VersionTags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (version, tags) in &self.0 {
            map.serialize_entry(version, tags)?;
        }
        map.end()
    }
}

/// Default prefix levels for [`version_tags`]
pub const DEFAULT_TAG_LEVELS: [usize; 2] = [2, 1];

/// Assigns tags to versions.
///
/// Every version is tagged with itself. For each prefix length in `levels`,
/// the newest version of each prefix also gets the prefix as a tag, and the
/// newest version overall gets the empty tag. `[1.0.0, 1.0.1]` yields
/// `1.0.1 => [1.0.1, 1.0, 1, ""]` and `1.0.0 => [1.0.0]`.
#[must_use]
pub fn version_tags<S: AsRef<str>>(versions: &[S], levels: &[usize]) -> VersionTags {
    let sorted = sorted_desc(versions);
    let parts: Vec<Vec<String>> = sorted.iter().map(|v| components(v)).collect();
    let mut tags: Vec<Vec<String>> = sorted.iter().map(|v| vec![v.clone()]).collect();

    for &level in levels {
        let mut previous: Option<&[String]> = None;
        for (i, p) in parts.iter().enumerate() {
            let prefix = &p[..level.min(p.len())];
            if previous != Some(prefix) {
                tags[i].push(prefix.join("."));
                previous = Some(prefix);
            }
        }
    }
    if let Some(newest) = tags.first_mut() {
        newest.push(String::new());
    }

    let mut result: Vec<(String, Vec<String>)> = Vec::with_capacity(tags.len());
    for t in tags {
        let version = t[0].clone();
        match result.iter_mut().find(|(v, _)| *v == version) {
            Some(slot) => slot.1 = t,
            None => result.push((version, t)),
        }
    }
    VersionTags(result)
}
