//! Version ranges in interval notation.
//!
//! | Text          | Meaning                                   |
//! |---------------|-------------------------------------------|
//! | `*`           | any version                               |
//! | `1.0`         | exactly 1.0 (or `>= 1.0` in legacy mode)  |
//! | `[1.0]`       | exactly 1.0                               |
//! | `[1.0,2.0)`   | 1.0 <= v < 2.0                            |
//! | `(1.0,)`      | v > 1.0                                   |
//! | `(,2.0]`      | v <= 2.0                                  |

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{DefaultComparer, PackageVersion, VersionComparer};
use crate::error::{Error, Result};

/// One end of a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBound {
    pub version: PackageVersion,
    pub inclusive: bool,
}

impl VersionBound {
    pub fn inclusive(version: PackageVersion) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    pub fn exclusive(version: PackageVersion) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }
}

/// An immutable interval over [`PackageVersion`]. A missing bound is unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageVersionRange {
    min: Option<VersionBound>,
    max: Option<VersionBound>,
}

impl PackageVersionRange {
    /// Build a range, failing with `InvertedRange` when `min > max`.
    ///
    /// Bound versions may not contain range delimiters (`,[]()`), so every
    /// constructed range renders to text that parses back to it.
    pub fn new(min: Option<VersionBound>, max: Option<VersionBound>) -> Result<Self> {
        for bound in min.iter().chain(max.iter()) {
            check_bound(&bound.version)?;
        }
        if let (Some(lo), Some(hi)) = (&min, &max)
            && lo.version.compare(&hi.version) == Ordering::Greater
        {
            return Err(Error::InvertedRange {
                min: lo.version.to_string(),
                max: hi.version.to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn exact(version: PackageVersion) -> Result<Self> {
        check_bound(&version)?;
        Ok(Self {
            min: Some(VersionBound::inclusive(version.clone())),
            max: Some(VersionBound::inclusive(version)),
        })
    }

    pub fn at_least(version: PackageVersion) -> Result<Self> {
        check_bound(&version)?;
        Ok(Self {
            min: Some(VersionBound::inclusive(version)),
            max: None,
        })
    }

    /// Parse interval notation.
    ///
    /// A bare version without brackets means `[v]` when `single_version_is_exact`
    /// is true, and the legacy minimum-inclusive `[v,)` otherwise.
    pub fn parse(text: &str, single_version_is_exact: bool) -> Result<Self> {
        let input = text.trim();
        if input.is_empty() {
            return Err(Error::malformed_range(text, "range is empty"));
        }
        if input == "*" {
            return Ok(Self::unbounded());
        }

        let opens = input.starts_with(['[', '(']);
        let closes = input.ends_with([']', ')']);
        match (opens, closes) {
            (false, false) => {
                if input.contains([',', '[', ']', '(', ')']) {
                    return Err(Error::malformed_range(
                        text,
                        "interval bounds must be enclosed in brackets",
                    ));
                }
                let version = PackageVersion::parse(input)?;
                if single_version_is_exact {
                    Self::exact(version)
                } else {
                    Self::at_least(version)
                }
            }
            (true, true) if input.len() >= 2 => Self::parse_interval(text, input),
            _ => Err(Error::malformed_range(text, "mismatched brackets")),
        }
    }

    fn parse_interval(text: &str, input: &str) -> Result<Self> {
        let min_inclusive = input.starts_with('[');
        let max_inclusive = input.ends_with(']');
        let inner = &input[1..input.len() - 1];
        if inner.contains(['[', ']', '(', ')']) {
            return Err(Error::malformed_range(text, "mismatched brackets"));
        }

        let Some((lo, hi)) = inner.split_once(',') else {
            let single = inner.trim();
            if single.is_empty() {
                return Err(Error::malformed_range(text, "no version bounds given"));
            }
            if !min_inclusive && !max_inclusive {
                return Err(Error::malformed_range(
                    text,
                    "a single version in parentheses is ambiguous",
                ));
            }
            if min_inclusive != max_inclusive {
                return Err(Error::malformed_range(
                    text,
                    "a single version must be written as [version]",
                ));
            }
            return Self::exact(PackageVersion::parse(single)?);
        };

        if hi.contains(',') {
            return Err(Error::malformed_range(text, "too many bounds"));
        }
        let (lo, hi) = (lo.trim(), hi.trim());
        if lo.is_empty() && hi.is_empty() {
            return Err(Error::malformed_range(text, "no version bounds given"));
        }

        let min = if lo.is_empty() {
            None
        } else {
            Some(VersionBound {
                version: PackageVersion::parse(lo)?,
                inclusive: min_inclusive,
            })
        };
        let max = if hi.is_empty() {
            None
        } else {
            Some(VersionBound {
                version: PackageVersion::parse(hi)?,
                inclusive: max_inclusive,
            })
        };
        Self::new(min, max)
    }

    pub fn min(&self) -> Option<&VersionBound> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&VersionBound> {
        self.max.as_ref()
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// True for `[v]` style ranges.
    pub fn is_exact(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(lo), Some(hi)) => {
                lo.inclusive && hi.inclusive && lo.version.compare(&hi.version) == Ordering::Equal
            }
            _ => false,
        }
    }

    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        self.satisfies_with(version, &DefaultComparer)
    }

    pub fn satisfies_with<C>(&self, version: &PackageVersion, comparer: &C) -> bool
    where
        C: VersionComparer + ?Sized,
    {
        let above_min = self.min.as_ref().is_none_or(|lo| {
            match comparer.compare(version, &lo.version) {
                Ordering::Greater => true,
                Ordering::Equal => lo.inclusive,
                Ordering::Less => false,
            }
        });
        let below_max = self.max.as_ref().is_none_or(|hi| {
            match comparer.compare(version, &hi.version) {
                Ordering::Less => true,
                Ordering::Equal => hi.inclusive,
                Ordering::Greater => false,
            }
        });
        above_min && below_max
    }

    /// Highest candidate that satisfies the range.
    pub fn best_match<'a, I>(&self, candidates: I) -> Option<&'a PackageVersion>
    where
        I: IntoIterator<Item = &'a PackageVersion>,
    {
        candidates
            .into_iter()
            .filter(|v| self.satisfies(v))
            .max_by(|a, b| a.compare(b))
    }
}

impl fmt::Display for PackageVersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact()
            && let Some(lo) = &self.min
        {
            return write!(f, "[{}]", lo.version);
        }
        match (&self.min, &self.max) {
            (None, None) => write!(f, "*"),
            (Some(lo), None) => write!(f, "{}{},)", open_bracket(lo), lo.version),
            (None, Some(hi)) => write!(f, "(,{}{}", hi.version, close_bracket(hi)),
            (Some(lo), Some(hi)) => write!(
                f,
                "{}{},{}{}",
                open_bracket(lo),
                lo.version,
                hi.version,
                close_bracket(hi)
            ),
        }
    }
}

fn check_bound(version: &PackageVersion) -> Result<()> {
    if version.as_str().contains([',', '[', ']', '(', ')']) {
        return Err(Error::malformed_range(
            version.as_str(),
            "a bound version may not contain range delimiters",
        ));
    }
    Ok(())
}

fn open_bracket(bound: &VersionBound) -> char {
    if bound.inclusive { '[' } else { '(' }
}

fn close_bracket(bound: &VersionBound) -> char {
    if bound.inclusive { ']' } else { ')' }
}

impl FromStr for PackageVersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PackageVersionRange::parse(s, true)
    }
}

impl Serialize for PackageVersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageVersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        PackageVersion::parse(s).unwrap()
    }

    fn r(s: &str) -> PackageVersionRange {
        s.parse().unwrap()
    }

    #[test]
    fn test_bare_version_is_exact_by_default() {
        let range = r("1.0");
        assert!(range.satisfies(&v("1.0")));
        assert!(range.satisfies(&v("1.0.0")));
        assert!(!range.satisfies(&v("1.0.1")));
        assert!(!range.satisfies(&v("0.9")));
        assert_eq!(range.to_string(), "[1.0]");
    }

    #[test]
    fn test_bare_version_legacy_minimum() {
        let range = PackageVersionRange::parse("1.0", false).unwrap();
        assert!(range.satisfies(&v("1.0")));
        assert!(range.satisfies(&v("7.3")));
        assert!(!range.satisfies(&v("0.9")));
        assert_eq!(range.to_string(), "[1.0,)");
    }

    #[test]
    fn test_half_open_interval() {
        let range = r("[1.0,2.0)");
        assert!(!range.satisfies(&v("2.0")));
        assert!(range.satisfies(&v("1.9")));
        assert!(range.satisfies(&v("1.0")));
        assert!(!range.satisfies(&v("2.0.0")));
        assert!(range.satisfies(&v("2.0-beta")));
    }

    #[test]
    fn test_open_ended_bounds() {
        let range = r("(1.0,]");
        assert!(!range.satisfies(&v("1.0")));
        assert!(range.satisfies(&v("100")));
        assert_eq!(range.to_string(), "(1.0,)");

        let range = r("(,2.0)");
        assert!(range.satisfies(&v("0.1")));
        assert!(!range.satisfies(&v("2.0")));
        assert_eq!(range.to_string(), "(,2.0)");
    }

    #[test]
    fn test_wildcard_is_unbounded() {
        let range = r("*");
        assert!(range.is_unbounded());
        assert!(range.satisfies(&v("anything")));
        assert_eq!(range.to_string(), "*");
    }

    #[test]
    fn test_malformed_ranges() {
        for bad in ["", "   ", "[1.0", "1.0]", "[1.0,2.0", "(1.0)", "[,]", "[]", "(,)", "[1.0)", "1.0,2.0", "[1,2,3]", "[[1.0]]"] {
            assert!(
                matches!(PackageVersionRange::parse(bad, true), Err(Error::MalformedRange { .. })),
                "'{}' should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_inverted_range() {
        assert!(matches!(
            PackageVersionRange::parse("[2.0,1.0]", true),
            Err(Error::InvertedRange { .. })
        ));
        assert!(PackageVersionRange::parse("[1.0,1.0]", true).unwrap().is_exact());
    }

    #[test]
    fn test_satisfies_with_custom_comparer() {
        // Compare by string length only
        let by_len = |a: &PackageVersion, b: &PackageVersion| a.as_str().len().cmp(&b.as_str().len());
        let range = r("[1.0,1.00]");
        assert!(range.satisfies_with(&v("zzz"), &by_len));
        assert!(!range.satisfies_with(&v("zz"), &by_len));
    }

    #[test]
    fn test_round_trip_preserves_satisfaction() {
        let samples = [
            "0.1", "1.0", "1.0-alpha", "1.0a", "1.5", "2.0", "2.0.1", "3", "10.0.0", "zeta",
        ];
        let ranges = vec![
            PackageVersionRange::unbounded(),
            PackageVersionRange::exact(v("1.0")).unwrap(),
            PackageVersionRange::at_least(v("1.5")).unwrap(),
            PackageVersionRange::exact(v("a-b")).unwrap(),
            PackageVersionRange::new(Some(VersionBound::exclusive(v("1.0"))), None).unwrap(),
            PackageVersionRange::new(None, Some(VersionBound::inclusive(v("2.0")))).unwrap(),
            PackageVersionRange::new(None, Some(VersionBound::exclusive(v("2.0")))).unwrap(),
            PackageVersionRange::new(
                Some(VersionBound::inclusive(v("1.0"))),
                Some(VersionBound::exclusive(v("3"))),
            )
            .unwrap(),
            PackageVersionRange::new(
                Some(VersionBound::exclusive(v("1.0-alpha"))),
                Some(VersionBound::inclusive(v("zeta"))),
            )
            .unwrap(),
        ];
        for range in ranges {
            let reparsed = r(&range.to_string());
            for sample in samples {
                let version = v(sample);
                assert_eq!(
                    range.satisfies(&version),
                    reparsed.satisfies(&version),
                    "range {} disagrees on {}",
                    range,
                    sample
                );
            }
        }
    }

    #[test]
    fn test_constructors_reject_delimiters_in_bounds() {
        for text in ["a,b", "x)", "(x", "[1.0]", "y]"] {
            let version = v(text);
            assert!(
                matches!(PackageVersionRange::exact(version.clone()), Err(Error::MalformedRange { .. })),
                "exact '{}' should be rejected",
                text
            );
            assert!(matches!(
                PackageVersionRange::at_least(version.clone()),
                Err(Error::MalformedRange { .. })
            ));
            assert!(matches!(
                PackageVersionRange::new(None, Some(VersionBound::exclusive(version))),
                Err(Error::MalformedRange { .. })
            ));
        }
        assert!(PackageVersionRange::exact(v("a b")).is_ok());
    }

    #[test]
    fn test_best_match() {
        let versions: Vec<PackageVersion> = ["1.0", "1.5", "2.0", "2.0-rc1"].iter().map(|s| v(s)).collect();
        let best = r("[1.0,2.0)").best_match(&versions);
        assert_eq!(best.map(|v| v.as_str()), Some("2.0-rc1"));
        assert!(r("[5.0,)").best_match(&versions).is_none());
    }

    #[test]
    fn test_whitespace_inside_brackets() {
        let range = r(" [ 1.0 , 2.0 ] ");
        assert!(range.satisfies(&v("2.0")));
        assert_eq!(range.to_string(), "[1.0,2.0]");
    }
}
