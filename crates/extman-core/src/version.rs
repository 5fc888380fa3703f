//! Extension versions, their total order, and dependency constraints.
//!
//! Extension versions are free-form strings (`1.0`, `2.3.1`, `1.0-rc1`,
//! `3.1-SNAPSHOT`). [`Version`] orders them token by token:
//!
//! - tokens are split on `.`, `-`, `_`, `+` and at digit/letter boundaries;
//! - numbers compare numerically and rank above any qualifier;
//! - qualifiers rank `alpha < beta < milestone < rc < snapshot < other`;
//!   `ga`, `final` and `release` count as `0`;
//! - a missing token counts as `0`, so `1.0 == 1.0.0` token-wise and
//!   `1.0-rc1 < 1.0`.
//!
//! Token-equal versions are ordered by their raw string so that `Ord` agrees
//! with `Eq`.
//!
//! [`VersionConstraint`] parses dependency constraints such as
//! `>=1.0,<2.0` and checks them against versions via semver.
//!
//! # Examples
//!
//! ```
//! use extman_core::version::{Version, VersionConstraint};
//!
//! assert!(Version::new("1.5") < Version::new("2.0"));
//! assert!(Version::new("1.10") > Version::new("1.9"));
//! assert!(Version::new("1.0-rc1") < Version::new("1.0"));
//!
//! let constraint = VersionConstraint::parse(">=1.0,<2.0").unwrap();
//! assert!(constraint.satisfies(&Version::new("1.5")));
//! assert!(!constraint.satisfies(&Version::new("2.0")));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single comparable piece of a version string.
///
/// Variant order matters: every qualifier sorts below every number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Token {
    Qualifier(u8, String),
    Number(u64),
}

static ZERO: Token = Token::Number(0);

fn qualifier_token(raw: &str) -> Token {
    let lower = raw.to_ascii_lowercase();
    let rank = match lower.as_str() {
        "ga" | "final" | "release" => return Token::Number(0),
        "alpha" | "a" => 0,
        "beta" | "b" => 1,
        "milestone" | "m" => 2,
        "rc" | "cr" => 3,
        "snapshot" => 4,
        _ => 5,
    };
    Token::Qualifier(rank, lower)
}

fn flush(current: &mut String, is_digit: bool, tokens: &mut Vec<Token>) {
    if current.is_empty() {
        return;
    }
    let token = if is_digit {
        current
            .parse::<u64>()
            .map(Token::Number)
            .unwrap_or_else(|_| qualifier_token(current.as_str()))
    } else {
        qualifier_token(current.as_str())
    };
    tokens.push(token);
    current.clear();
}

fn tokenize(raw: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;

    for c in raw.trim().chars() {
        if matches!(c, '.' | '-' | '_' | '+') {
            flush(&mut current, current_is_digit, &mut tokens);
            continue;
        }
        let is_digit = c.is_ascii_digit();
        if !current.is_empty() && is_digit != current_is_digit {
            flush(&mut current, current_is_digit, &mut tokens);
        }
        current_is_digit = is_digit;
        current.push(c);
    }
    flush(&mut current, current_is_digit, &mut tokens);

    tokens
}

/// An extension version with a total order.
///
/// Equality and hashing use the raw string; ordering is token based with the
/// raw string as tie-break.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version {
    raw: String,
    tokens: Vec<Token>,
}

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let tokens = tokenize(&raw);
        Self { raw, tokens }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Compare by tokens only, ignoring the raw-string tie-break.
    ///
    /// `Version::new("1.0").compare_tokens(&Version::new("1.0.0"))` is
    /// `Equal` even though the two versions are not `==`.
    pub fn compare_tokens(&self, other: &Self) -> Ordering {
        let len = self.tokens.len().max(other.tokens.len());
        for i in 0..len {
            let left = self.tokens.get(i).unwrap_or(&ZERO);
            let right = other.tokens.get(i).unwrap_or(&ZERO);
            match left.cmp(right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }

    /// Interpret this version as semver, padding `major` and `major.minor`.
    pub fn to_semver(&self) -> Option<semver::Version> {
        normalize_version(&self.raw).ok()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_tokens(other)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.raw)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for Version {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.raw
    }
}

/// Total order used to keep per-identity version lists sorted.
///
/// Implementations must be transitive and consistent; the repository relies
/// on it for ordered insertion.
pub trait VersionComparator: Send + Sync + fmt::Debug {
    fn compare(&self, left: &Version, right: &Version) -> Ordering;
}

/// Comparator backed by [`Version`]'s own ordering.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultVersionComparator;

impl VersionComparator for DefaultVersionComparator {
    fn compare(&self, left: &Version, right: &Version) -> Ordering {
        left.cmp(right)
    }
}

/// A single version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Gte,
    Gt,
    Lte,
    Lt,
    Eq,
    Ne,
}

/// An operator paired with a version.
#[derive(Debug, Clone)]
struct Specifier {
    op: CompareOp,
    version: semver::Version,
}

impl Specifier {
    fn matches(&self, candidate: &semver::Version) -> bool {
        match self.op {
            CompareOp::Gte => candidate >= &self.version,
            CompareOp::Gt => candidate > &self.version,
            CompareOp::Lte => candidate <= &self.version,
            CompareOp::Lt => candidate < &self.version,
            CompareOp::Eq => candidate == &self.version,
            CompareOp::Ne => candidate != &self.version,
        }
    }
}

/// A parsed dependency version constraint.
///
/// Comma-separated specifiers must all match. A bare version means `==`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionConstraint {
    specifiers: Vec<Specifier>,
    raw: String,
}

impl VersionConstraint {
    /// Parse a constraint such as `>=1.0`, `>=1.0,<2.0` or `2.1.0`.
    ///
    /// Version components can be `major`, `major.minor` or
    /// `major.minor.patch`.
    pub fn parse(constraint: &str) -> Result<Self> {
        let raw = constraint.trim().to_string();
        let mut specifiers = Vec::new();

        for part in raw.split(',').map(str::trim) {
            if part.is_empty() {
                continue;
            }
            specifiers.push(parse_specifier(part)?);
        }

        if specifiers.is_empty() {
            return Err(Error::VersionConstraintParse {
                constraint: raw,
                reason: "empty constraint".to_string(),
            });
        }

        Ok(Self { specifiers, raw })
    }

    /// Check whether `version` satisfies every specifier.
    ///
    /// Versions that cannot be read as semver never satisfy a constraint.
    pub fn satisfies(&self, version: &Version) -> bool {
        match version.to_semver() {
            Some(parsed) => self.satisfies_semver(&parsed),
            None => false,
        }
    }

    pub fn satisfies_semver(&self, version: &semver::Version) -> bool {
        self.specifiers.iter().all(|spec| spec.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for VersionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for VersionConstraint {}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for VersionConstraint {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<VersionConstraint> for String {
    fn from(constraint: VersionConstraint) -> Self {
        constraint.raw
    }
}

fn parse_specifier(s: &str) -> Result<Specifier> {
    let (op, version_str) = if let Some(rest) = s.strip_prefix(">=") {
        (CompareOp::Gte, rest)
    } else if let Some(rest) = s.strip_prefix("<=") {
        (CompareOp::Lte, rest)
    } else if let Some(rest) = s.strip_prefix("!=") {
        (CompareOp::Ne, rest)
    } else if let Some(rest) = s.strip_prefix("==") {
        (CompareOp::Eq, rest)
    } else if let Some(rest) = s.strip_prefix('>') {
        (CompareOp::Gt, rest)
    } else if let Some(rest) = s.strip_prefix('<') {
        (CompareOp::Lt, rest)
    } else {
        (CompareOp::Eq, s)
    };

    let version_str = version_str.trim();
    let version = normalize_version(version_str).map_err(|reason| Error::VersionConstraintParse {
        constraint: s.to_string(),
        reason,
    })?;

    Ok(Specifier { op, version })
}

/// Read a version as semver, padding missing minor/patch components with 0.
///
/// - `"3"` -> `3.0.0`
/// - `"3.12"` -> `3.12.0`
/// - `"3.12.1"` -> `3.12.1`
fn normalize_version(s: &str) -> std::result::Result<semver::Version, String> {
    let s = s.trim();

    if let Ok(v) = semver::Version::parse(s) {
        return Ok(v);
    }

    let (core, suffix) = match s.find(['-', '+']) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    };
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => return Err(format!("invalid version '{s}'")),
    };
    semver::Version::parse(&padded).map_err(|e| format!("invalid version '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> Version {
        Version::new(raw)
    }

    #[test]
    fn test_numeric_components_compare_numerically() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2.0") > v("1.5"));
        assert!(v("1.0") < v("1.0.1"));
    }

    #[test]
    fn test_trailing_zeros_are_token_equal() {
        assert_eq!(v("1.0").compare_tokens(&v("1.0.0")), Ordering::Equal);
        assert_ne!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1.0").cmp(&v("1.0.0")), Ordering::Less);
    }

    #[test]
    fn test_qualifiers_sort_before_release() {
        assert!(v("1.0-alpha") < v("1.0-beta"));
        assert!(v("1.0-beta") < v("1.0-milestone-1"));
        assert!(v("1.0-milestone-1") < v("1.0-rc1"));
        assert!(v("1.0-rc1") < v("1.0-SNAPSHOT"));
        assert!(v("1.0-SNAPSHOT") < v("1.0"));
        assert!(v("1.0") < v("1.0.1-rc1"));
    }

    #[test]
    fn test_release_qualifiers_equal_plain_version() {
        assert_eq!(v("1.0-final").compare_tokens(&v("1.0")), Ordering::Equal);
        assert_eq!(v("2.0.GA").compare_tokens(&v("2.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_letter_digit_boundaries_split() {
        assert!(v("1.0rc2") > v("1.0rc1"));
        assert!(v("1.0rc10") > v("1.0rc9"));
    }

    #[test]
    fn test_default_comparator_matches_ord() {
        let comparator = DefaultVersionComparator;
        assert_eq!(comparator.compare(&v("1.5"), &v("2.0")), Ordering::Less);
        assert_eq!(comparator.compare(&v("2.0"), &v("2.0")), Ordering::Equal);
    }

    #[test]
    fn test_version_serializes_as_string() {
        let json = serde_json::to_string(&v("1.2-rc1")).unwrap();
        assert_eq!(json, "\"1.2-rc1\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2-rc1"));
    }

    #[test]
    fn test_parse_constraints() {
        assert_eq!(VersionConstraint::parse(">=1.0").unwrap().specifiers.len(), 1);
        assert_eq!(VersionConstraint::parse(">=1.0, <2.0").unwrap().specifiers.len(), 2);
        assert!(VersionConstraint::parse("").is_err());
        assert!(VersionConstraint::parse(">=abc").is_err());
    }

    #[test]
    fn test_constraint_satisfaction() {
        let c = VersionConstraint::parse(">=1.0,<2.0").unwrap();
        assert!(c.satisfies(&v("1.0")));
        assert!(c.satisfies(&v("1.9.3")));
        assert!(!c.satisfies(&v("2.0")));
        assert!(!c.satisfies(&v("0.9")));
    }

    #[test]
    fn test_bare_constraint_is_exact() {
        let c = VersionConstraint::parse("2.1").unwrap();
        assert!(c.satisfies(&v("2.1.0")));
        assert!(!c.satisfies(&v("2.1.1")));
    }

    #[test]
    fn test_ne_constraint() {
        let c = VersionConstraint::parse("!=1.5").unwrap();
        assert!(c.satisfies(&v("1.4")));
        assert!(!c.satisfies(&v("1.5.0")));
    }

    #[test]
    fn test_unparseable_version_never_satisfies() {
        let c = VersionConstraint::parse(">=1.0").unwrap();
        assert!(!c.satisfies(&v("nightly")));
    }

    #[test]
    fn test_normalize_pads_components() {
        assert_eq!(normalize_version("3").unwrap(), semver::Version::new(3, 0, 0));
        assert_eq!(normalize_version("3.12").unwrap(), semver::Version::new(3, 12, 0));
        assert_eq!(
            normalize_version("1.0-rc1").unwrap(),
            semver::Version::parse("1.0.0-rc1").unwrap()
        );
    }

    #[test]
    fn test_constraint_display_keeps_raw() {
        let c = VersionConstraint::parse(">=1.0,<2.0").unwrap();
        assert_eq!(c.to_string(), ">=1.0,<2.0");
    }
}
