//! Version ordering and version-range matching for skin prerequisites.
//!
//! Ranges use the bracket notation common to Java build tools:
//!
//! | Range           | Meaning                       |
//! |-----------------|-------------------------------|
//! | `1.0`           | recommended 1.0, i.e. `>= 1.0` |
//! | `[1.0,2.0)`     | `1.0 <= v < 2.0`              |
//! | `[1.5]`         | exactly 1.5                   |
//! | `(,1.0],[1.2,)` | `v <= 1.0` or `v >= 1.2`      |

use std::{cmp::Ordering, fmt, str::FromStr};

use thiserror::Error;

/// A version range that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid version range '{range}': {reason}")]
pub struct VersionRangeError {
    pub range: String,
    pub reason: String,
}

impl VersionRangeError {
    fn new(range: &str, reason: impl Into<String>) -> Self {
        Self {
            range: range.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Number(u64),
    Qualifier(String),
}

/// Rank of a qualifier; releases sit between pre-releases and service packs.
fn qualifier_rank(qualifier: &str) -> (u8, &str) {
    match qualifier {
        "alpha" | "a" => (0, ""),
        "beta" | "b" => (1, ""),
        "milestone" | "m" => (2, ""),
        "rc" | "cr" => (3, ""),
        "snapshot" => (4, ""),
        "" | "ga" | "final" | "release" => (5, ""),
        "sp" => (6, ""),
        other => (7, other),
    }
}

fn flush(token: &mut String, items: &mut Vec<Item>) {
    if token.is_empty() {
        return;
    }
    let item = if token.bytes().all(|b| b.is_ascii_digit()) {
        Item::Number(token.parse().unwrap_or(u64::MAX))
    } else {
        Item::Qualifier(token.clone())
    };
    token.clear();
    items.push(item);
}

fn compare_items(left: Option<&Item>, right: Option<&Item>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (Some(Item::Number(a)), Some(Item::Number(b))) => a.cmp(b),
        (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
        (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
        (Some(Item::Qualifier(a)), Some(Item::Qualifier(b))) => {
            qualifier_rank(a).cmp(&qualifier_rank(b))
        }
        (Some(Item::Number(n)), None) => n.cmp(&0),
        (Some(Item::Qualifier(q)), None) => qualifier_rank(q).cmp(&qualifier_rank("")),
        (None, Some(_)) => compare_items(right, left).reverse(),
    }
}

/// A comparable artifact version such as `1.11.1` or `2.0-beta-1`.
#[derive(Debug, Clone)]
pub struct ArtifactVersion {
    raw: String,
    items: Vec<Item>,
}

impl ArtifactVersion {
    /// Parse a version string. Every string is a valid version.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        let mut items = Vec::new();
        let mut token = String::new();

        for c in lower.chars() {
            if c == '.' || c == '-' || c == '_' {
                flush(&mut token, &mut items);
                continue;
            }
            // A digit/letter transition starts a new item: `1rc2` is `1, rc, 2`.
            if let Some(last) = token.chars().last()
                && last.is_ascii_digit() != c.is_ascii_digit()
            {
                flush(&mut token, &mut items);
            }
            token.push(c);
        }
        flush(&mut token, &mut items);

        while let Some(last) = items.last() {
            let trailing_zero = match last {
                Item::Number(n) => *n == 0,
                Item::Qualifier(q) => qualifier_rank(q) == qualifier_rank(""),
            };
            if !trailing_zero {
                break;
            }
            items.pop();
        }

        Self {
            raw: raw.to_string(),
            items,
        }
    }

    /// The version as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for ArtifactVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Ord for ArtifactVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        (0..len)
            .map(|i| compare_items(self.items.get(i), other.items.get(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ArtifactVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ArtifactVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for ArtifactVersion {}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One bracketed interval of a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub lower: Option<ArtifactVersion>,
    pub lower_inclusive: bool,
    pub upper: Option<ArtifactVersion>,
    pub upper_inclusive: bool,
}

impl Restriction {
    /// Whether `version` lies inside this interval.
    pub fn contains(&self, version: &ArtifactVersion) -> bool {
        let above_lower = match &self.lower {
            Some(lower) if self.lower_inclusive => version >= lower,
            Some(lower) => version > lower,
            None => true,
        };
        let below_upper = match &self.upper {
            Some(upper) if self.upper_inclusive => version <= upper,
            Some(upper) => version < upper,
            None => true,
        };
        above_lower && below_upper
    }

    fn parse(spec: &str, range: &str) -> Result<Self, VersionRangeError> {
        let lower_inclusive = spec.starts_with('[');
        let upper_inclusive = spec.ends_with(']');
        let inner = spec[1..spec.len() - 1].trim();

        let Some((low, high)) = inner.split_once(',') else {
            // `[1.5]` pins a single version.
            if !(lower_inclusive && upper_inclusive) || inner.is_empty() {
                return Err(VersionRangeError::new(
                    range,
                    format!("single version must be written [version], got {spec}"),
                ));
            }
            let version = ArtifactVersion::new(inner);
            return Ok(Self {
                lower: Some(version.clone()),
                lower_inclusive: true,
                upper: Some(version),
                upper_inclusive: true,
            });
        };

        if high.contains(',') {
            return Err(VersionRangeError::new(
                range,
                format!("too many bounds in {spec}"),
            ));
        }

        let bound = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| ArtifactVersion::new(s))
        };
        let lower = bound(low);
        let upper = bound(high);

        if let (Some(l), Some(u)) = (&lower, &upper) {
            if u < l {
                return Err(VersionRangeError::new(
                    range,
                    format!("upper bound is below lower bound in {spec}"),
                ));
            }
            if l == u && !(lower_inclusive && upper_inclusive) {
                return Err(VersionRangeError::new(range, format!("empty interval {spec}")));
            }
        }

        Ok(Self {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        })
    }
}

/// A version range: either a recommended version or a set of restrictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    recommended: Option<ArtifactVersion>,
    restrictions: Vec<Restriction>,
}

impl VersionRange {
    /// Parse a range specification.
    pub fn parse(spec: &str) -> Result<Self, VersionRangeError> {
        let raw = spec.trim();
        if raw.is_empty() {
            return Err(VersionRangeError::new(spec, "empty range"));
        }

        if !raw.starts_with(['[', '(']) {
            if raw.contains(['[', ']', '(', ')', ',']) {
                return Err(VersionRangeError::new(
                    raw,
                    "text outside of a bracketed restriction",
                ));
            }
            return Ok(Self {
                raw: raw.to_string(),
                recommended: Some(ArtifactVersion::new(raw)),
                restrictions: Vec::new(),
            });
        }

        let mut restrictions: Vec<Restriction> = Vec::new();
        let mut rest = raw;
        while !rest.is_empty() {
            if !rest.starts_with(['[', '(']) {
                return Err(VersionRangeError::new(
                    raw,
                    format!("expected '[' or '(' at '{rest}'"),
                ));
            }
            let close = rest
                .find([']', ')'])
                .ok_or_else(|| VersionRangeError::new(raw, "unbalanced brackets"))?;
            let restriction = Restriction::parse(&rest[..=close], raw)?;

            if let Some(previous) = restrictions.last() {
                let ordered = match (&previous.upper, &restriction.lower) {
                    (Some(upper), Some(lower)) => {
                        upper < lower
                            || (upper == lower
                                && !(previous.upper_inclusive && restriction.lower_inclusive))
                    }
                    _ => false,
                };
                if !ordered {
                    return Err(VersionRangeError::new(raw, "restrictions overlap"));
                }
            }
            restrictions.push(restriction);

            rest = rest[close + 1..].trim_start();
            if let Some(after) = rest.strip_prefix(',') {
                rest = after.trim_start();
                if rest.is_empty() {
                    return Err(VersionRangeError::new(raw, "trailing ','"));
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            recommended: None,
            restrictions,
        })
    }

    /// Recommended version, for plain (unbracketed) ranges.
    pub fn recommended(&self) -> Option<&ArtifactVersion> {
        self.recommended.as_ref()
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn has_restrictions(&self) -> bool {
        !self.restrictions.is_empty()
    }

    /// Whether `version` satisfies this range.
    ///
    /// A recommended version is a minimum; restrictions match when any of
    /// them contains the version.
    pub fn matches(&self, version: &ArtifactVersion) -> bool {
        if self.has_restrictions() {
            self.restrictions.iter().any(|r| r.contains(version))
        } else {
            self.recommended.as_ref().is_none_or(|r| r <= version)
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ArtifactVersion {
        ArtifactVersion::new(s)
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("1.0") < v("1.1"));
        assert!(v("1.9") < v("1.10"));
        assert_eq!(v("1.0"), v("1"));
        assert_eq!(v("1.0.0"), v("1-final"));
        assert!(v("1.0-alpha-1") < v("1.0-beta"));
        assert!(v("1.0-beta") < v("1.0-rc1"));
        assert!(v("1.0-rc1") < v("1.0-SNAPSHOT"));
        assert!(v("1.0-SNAPSHOT") < v("1.0"));
        assert!(v("1.0") < v("1.0-sp1"));
        assert!(v("1.0") < v("1.0.1"));
    }

    #[test]
    fn test_half_open_range() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.has_restrictions());
        assert!(range.matches(&v("1.0")));
        assert!(range.matches(&v("1.5")));
        assert!(range.matches(&v("1.99")));
        assert!(!range.matches(&v("2.0")));
        assert!(!range.matches(&v("0.9")));
    }

    #[test]
    fn test_recommended_version_is_minimum() {
        let range = VersionRange::parse("1.5").unwrap();
        assert_eq!(range.recommended(), Some(&v("1.5")));
        assert!(range.matches(&v("1.5")));
        assert!(range.matches(&v("3.0")));
        assert!(!range.matches(&v("1.4.9")));
    }

    #[test]
    fn test_exact_and_unbounded_ranges() {
        let exact = VersionRange::parse("[1.5]").unwrap();
        assert!(exact.matches(&v("1.5.0")));
        assert!(!exact.matches(&v("1.5.1")));

        let open = VersionRange::parse("[1.1,)").unwrap();
        assert!(open.matches(&v("99")));
        assert!(!open.matches(&v("1.0")));

        let multi = VersionRange::parse("(,1.0],[1.2,)").unwrap();
        assert!(multi.matches(&v("0.5")));
        assert!(!multi.matches(&v("1.1")));
        assert!(multi.matches(&v("1.2")));
    }

    #[test]
    fn test_invalid_ranges() {
        for spec in ["", "[1.0", "(1.0)", "[2.0,1.0]", "[1.0,2.0,3.0]", "1.0]", "[1.0,2.0],[1.5,)", "[1.0,2.0),"] {
            let err = VersionRange::parse(spec);
            assert!(err.is_err(), "expected '{spec}' to be rejected");
        }
    }

    #[test]
    fn test_display_keeps_spec() {
        let range = VersionRange::parse(" [1.0,2.0) ").unwrap();
        assert_eq!(range.to_string(), "[1.0,2.0)");
        assert_eq!(v("1.5-RC1").to_string(), "1.5-RC1");
    }
}
