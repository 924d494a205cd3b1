//! Package version model.
//!
//! A [`PackageVersion`] accepts any non-blank version string. The string is
//! classified into one [`VersionScheme`] by trying grammars in a fixed order:
//!
//! 1. `SemanticVersion` - `MAJOR.MINOR.PATCH[-pre][+build]` (semver 2.0, except that
//!    numeric prerelease identifiers may have leading zeros)
//! 2. `MultiPartNumericWithSuffix` - `1.2.3a`, `10b2`
//! 3. `MultiPartNumeric` - `1.2`, `1.2.3.4`, `1.0-beta`
//! 4. `Integer` - `42`
//! 5. `AlphaNumeric` - anything else, compared as an opaque string
//!
//! Surrounding whitespace is trimmed on parse; equality is exact identity of
//! the trimmed string. Ordering is a separate relation exposed
//! through [`PackageVersion::compare`] and [`VersionComparer`], so the type
//! intentionally does not implement `Ord`.

mod range;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

pub use range::{PackageVersionRange, VersionBound};

/// The version-syntax family a version string was parsed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionScheme {
    AlphaNumeric,
    Integer,
    MultiPartNumeric,
    MultiPartNumericWithSuffix,
    SemanticVersion,
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionScheme::AlphaNumeric => write!(f, "alphanumeric"),
            VersionScheme::Integer => write!(f, "integer"),
            VersionScheme::MultiPartNumeric => write!(f, "multi-part-numeric"),
            VersionScheme::MultiPartNumericWithSuffix => write!(f, "multi-part-numeric-with-suffix"),
            VersionScheme::SemanticVersion => write!(f, "semantic-version"),
        }
    }
}

/// An immutable, parsed version string.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    original: String,
    parts: Vec<u64>,
    suffix: Option<String>,
    prerelease: Vec<String>,
    build_metadata: Vec<String>,
    scheme: VersionScheme,
}

impl PackageVersion {
    /// Parse a version string.
    ///
    /// Only empty or blank input is rejected; anything that matches none of
    /// the numeric grammars becomes an `AlphaNumeric` version.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::MalformedVersion(text.to_string()));
        }
        Ok(Self::classify(trimmed))
    }

    fn classify(text: &str) -> Self {
        parse_semantic(text)
            .or_else(|| parse_numeric(text))
            .unwrap_or_else(|| PackageVersion {
                original: text.to_string(),
                parts: Vec::new(),
                suffix: None,
                prerelease: Vec::new(),
                build_metadata: Vec::new(),
                scheme: VersionScheme::AlphaNumeric,
            })
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn scheme(&self) -> VersionScheme {
        self.scheme
    }

    /// Numeric components, empty for `AlphaNumeric` versions.
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn prerelease(&self) -> &[String] {
        &self.prerelease
    }

    pub fn build_metadata(&self) -> &[String] {
        &self.build_metadata
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Total order over versions.
    ///
    /// AlphaNumeric versions sort above every numeric version. Numeric
    /// versions compare by parts (missing trailing parts count as zero), then
    /// suffix (present sorts higher), then prerelease (present sorts lower).
    /// Build metadata never affects the order.
    pub fn compare(&self, other: &PackageVersion) -> Ordering {
        let self_alpha = self.scheme == VersionScheme::AlphaNumeric;
        let other_alpha = other.scheme == VersionScheme::AlphaNumeric;
        match (self_alpha, other_alpha) {
            (true, true) => return self.original.cmp(&other.original),
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }

        compare_parts(&self.parts, &other.parts)
            .then_with(|| compare_suffix(self.suffix(), other.suffix()))
            .then_with(|| compare_prerelease(&self.prerelease, &other.prerelease))
    }

    /// Convert to the structural `major.minor[.build[.revision]]` form.
    pub fn to_structured(&self) -> Result<StructuredVersion> {
        StructuredVersion::try_from(self)
    }
}

fn compare_parts(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_suffix(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

fn compare_prerelease(a: &[String], b: &[String]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).map(String::as_str).unwrap_or("");
            let y = b.get(i).map(String::as_str).unwrap_or("");
            x.cmp(y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn parse_semantic(text: &str) -> Option<PackageVersion> {
    let (parts, prerelease, build_metadata) = match semver::Version::parse(text) {
        Ok(v) => (
            vec![v.major, v.minor, v.patch],
            split_identifiers(v.pre.as_str()),
            split_identifiers(v.build.as_str()),
        ),
        Err(_) => parse_semantic_relaxed(text)?,
    };
    Some(PackageVersion {
        original: text.to_string(),
        parts,
        suffix: None,
        prerelease,
        build_metadata,
        scheme: VersionScheme::SemanticVersion,
    })
}

/// `semver` rejects numeric prerelease identifiers with leading zeros
/// (`1.0.0-alpha.01`). Only the core numbers are held to that rule here.
fn parse_semantic_relaxed(text: &str) -> Option<(Vec<u64>, Vec<String>, Vec<String>)> {
    let (head, build_metadata) = match text.split_once('+') {
        Some((head, build)) => (head, parse_identifiers(build)?),
        None => (text, Vec::new()),
    };
    let (core, prerelease) = match head.split_once('-') {
        Some((core, pre)) => (core, parse_identifiers(pre)?),
        None => (head, Vec::new()),
    };

    let segments: Vec<&str> = core.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.len() > 1 && s.starts_with('0')) {
        return None;
    }
    let parts = segments
        .into_iter()
        .map(parse_part)
        .collect::<Option<Vec<u64>>>()?;
    Some((parts, prerelease, build_metadata))
}

fn split_identifiers(s: &str) -> Vec<String> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split('.').map(String::from).collect()
    }
}

/// Dot-separated, non-empty `[0-9A-Za-z-]` identifiers.
fn parse_identifiers(s: &str) -> Option<Vec<String>> {
    let ids: Vec<String> = s.split('.').map(String::from).collect();
    let valid = ids
        .iter()
        .all(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    valid.then_some(ids)
}

fn parse_part(s: &str) -> Option<u64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Integer, multi-part numeric and numeric-with-suffix grammars.
fn parse_numeric(text: &str) -> Option<PackageVersion> {
    let (head, build_metadata) = match text.split_once('+') {
        Some((head, build)) => (head, parse_identifiers(build)?),
        None => (text, Vec::new()),
    };
    let (core, prerelease) = match head.split_once('-') {
        Some((core, pre)) => (core, parse_identifiers(pre)?),
        None => (head, Vec::new()),
    };

    let mut segments: Vec<&str> = core.split('.').collect();
    let last = segments.pop()?;
    let mut parts = segments
        .into_iter()
        .map(parse_part)
        .collect::<Option<Vec<u64>>>()?;

    // Only the last segment may carry a suffix, attached without a separator.
    let digits_end = last
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(last.len());
    let (number, suffix) = last.split_at(digits_end);
    parts.push(parse_part(number)?);

    let suffix = if suffix.is_empty() {
        None
    } else if suffix.starts_with(|c: char| c.is_ascii_alphabetic())
        && suffix.chars().all(|c| c.is_ascii_alphanumeric())
    {
        Some(suffix.to_string())
    } else {
        return None;
    };

    let scheme = match (&suffix, parts.len()) {
        (Some(_), _) => VersionScheme::MultiPartNumericWithSuffix,
        (None, 1) => VersionScheme::Integer,
        (None, _) => VersionScheme::MultiPartNumeric,
    };

    Some(PackageVersion {
        original: text.to_string(),
        parts,
        suffix,
        prerelease,
        build_metadata,
        scheme,
    })
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.original == other.original
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.original.hash(state);
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PackageVersion::parse(s)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PackageVersion::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Ordering used by ranges and version selection.
///
/// Implemented for [`DefaultComparer`] and for any
/// `Fn(&PackageVersion, &PackageVersion) -> Ordering`.
pub trait VersionComparer {
    fn compare(&self, a: &PackageVersion, b: &PackageVersion) -> Ordering;
}

/// The ordering of [`PackageVersion::compare`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparer;

impl VersionComparer for DefaultComparer {
    fn compare(&self, a: &PackageVersion, b: &PackageVersion) -> Ordering {
        a.compare(b)
    }
}

impl<F> VersionComparer for F
where
    F: Fn(&PackageVersion, &PackageVersion) -> Ordering,
{
    fn compare(&self, a: &PackageVersion, b: &PackageVersion) -> Ordering {
        self(a, b)
    }
}

/// A `major.minor[.build[.revision]]` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuredVersion {
    pub major: u64,
    pub minor: u64,
    pub build: Option<u64>,
    pub revision: Option<u64>,
}

impl fmt::Display for StructuredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        match (self.build, self.revision) {
            (Some(build), Some(revision)) => write!(f, ".{}.{}", build, revision),
            (None, Some(revision)) => write!(f, ".0.{}", revision),
            (Some(build), None) => write!(f, ".{}", build),
            (None, None) => Ok(()),
        }
    }
}

impl TryFrom<&PackageVersion> for StructuredVersion {
    type Error = Error;

    fn try_from(version: &PackageVersion) -> Result<Self> {
        let text = version.as_str();
        if version.scheme == VersionScheme::AlphaNumeric {
            return Err(Error::unsupported_conversion(text, "alphanumeric versions have no numeric parts"));
        }
        if version.suffix.is_some() {
            return Err(Error::unsupported_conversion(text, "versions with a suffix have no structural form"));
        }
        if version.is_prerelease() || !version.build_metadata.is_empty() {
            return Err(Error::unsupported_conversion(
                text,
                "prerelease and build metadata have no structural form",
            ));
        }
        match version.parts.as_slice() {
            [major, minor] => Ok(StructuredVersion {
                major: *major,
                minor: *minor,
                build: None,
                revision: None,
            }),
            [major, minor, build] => Ok(StructuredVersion {
                major: *major,
                minor: *minor,
                build: Some(*build),
                revision: None,
            }),
            [major, minor, build, revision] => Ok(StructuredVersion {
                major: *major,
                minor: *minor,
                build: Some(*build),
                revision: Some(*revision),
            }),
            parts => Err(Error::unsupported_conversion(
                text,
                format!("expected 2 to 4 numeric parts, found {}", parts.len()),
            )),
        }
    }
}

impl From<StructuredVersion> for PackageVersion {
    fn from(version: StructuredVersion) -> Self {
        PackageVersion::classify(&version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        PackageVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(matches!(PackageVersion::parse(""), Err(Error::MalformedVersion(_))));
        assert!(matches!(PackageVersion::parse("   "), Err(Error::MalformedVersion(_))));
    }

    #[test]
    fn test_semantic_versions_round_trip() {
        for s in ["0.0.0", "1.2.3", "10.20.30", "1.0.0-alpha.1", "1.0.0+build.5", "2.0.0-rc.1+sha.abc"] {
            let version = v(s);
            assert_eq!(version.scheme(), VersionScheme::SemanticVersion, "{}", s);
            assert_eq!(version.to_string(), s);
        }
    }

    #[test]
    fn test_semantic_fields() {
        let version = v("1.2.3-beta.2+exp.sha");
        assert_eq!(version.parts(), &[1, 2, 3]);
        assert_eq!(version.prerelease(), &["beta".to_string(), "2".to_string()]);
        assert_eq!(version.build_metadata(), &["exp".to_string(), "sha".to_string()]);
        assert!(version.is_prerelease());
    }

    #[test]
    fn test_leading_zero_prerelease_is_semantic() {
        for s in ["1.0.0-alpha.01", "1.0.0-01", "1.0.0-01+007"] {
            assert_eq!(v(s).scheme(), VersionScheme::SemanticVersion, "{}", s);
        }
        let version = v("1.0.0-alpha.01");
        assert_eq!(version.parts(), &[1, 0, 0]);
        assert_eq!(version.prerelease(), &["alpha".to_string(), "01".to_string()]);
        assert_eq!(version.compare(&v("1.0.0")), Ordering::Less);
        assert_eq!(v("1.0.0-01+007").build_metadata(), &["007".to_string()]);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let version = v(" 1.0 ");
        assert_eq!(version.as_str(), "1.0");
        assert_eq!(version, v("1.0"));
    }

    #[test]
    fn test_leading_zero_is_not_semantic() {
        let version = v("01.2.3");
        assert_eq!(version.scheme(), VersionScheme::MultiPartNumeric);
        assert_eq!(version.parts(), &[1, 2, 3]);
    }

    #[test]
    fn test_scheme_detection() {
        assert_eq!(v("1.2.3a").scheme(), VersionScheme::MultiPartNumericWithSuffix);
        assert_eq!(v("7b2").scheme(), VersionScheme::MultiPartNumericWithSuffix);
        assert_eq!(v("1.2").scheme(), VersionScheme::MultiPartNumeric);
        assert_eq!(v("1.2.3.4").scheme(), VersionScheme::MultiPartNumeric);
        assert_eq!(v("1.0-alpha").scheme(), VersionScheme::MultiPartNumeric);
        assert_eq!(v("42").scheme(), VersionScheme::Integer);
        assert_eq!(v("latest").scheme(), VersionScheme::AlphaNumeric);
        assert_eq!(v("v1.0.0").scheme(), VersionScheme::AlphaNumeric);
        assert_eq!(v("1..2").scheme(), VersionScheme::AlphaNumeric);
        assert_eq!(v("1.2.a").scheme(), VersionScheme::AlphaNumeric);
        assert_eq!(v("1.0-").scheme(), VersionScheme::AlphaNumeric);
    }

    #[test]
    fn test_suffix_fields() {
        let version = v("1.2.3rc1");
        assert_eq!(version.parts(), &[1, 2, 3]);
        assert_eq!(version.suffix(), Some("rc1"));
    }

    #[test]
    fn test_numeric_overflow_falls_back_to_alphanumeric() {
        assert_eq!(v("99999999999999999999999.1").scheme(), VersionScheme::AlphaNumeric);
    }

    #[test]
    fn test_alphanumeric_sorts_above_numeric() {
        for numeric in ["1.0", "999.999.999", "5", "1.0a", "1.0.0-beta"] {
            assert_eq!(v("abc").compare(&v(numeric)), Ordering::Greater);
            assert_eq!(v(numeric).compare(&v("abc")), Ordering::Less);
        }
        assert_eq!(v("abc").compare(&v("abd")), Ordering::Less);
        assert_eq!(v("B").compare(&v("a")), Ordering::Less);
    }

    #[test]
    fn test_missing_trailing_parts_are_zero() {
        assert_eq!(v("1.0").compare(&v("1.0.0")), Ordering::Equal);
        assert_eq!(v("1.0.0.1").compare(&v("1.0.0")), Ordering::Greater);
        assert_eq!(v("2").compare(&v("1.9.9")), Ordering::Greater);
        assert_eq!(v("1.10").compare(&v("1.9")), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_lowers_and_suffix_raises() {
        assert_eq!(v("1.0-alpha").compare(&v("1.0")), Ordering::Less);
        assert_eq!(v("1.0a").compare(&v("1.0")), Ordering::Greater);
        assert_eq!(v("1.0a").compare(&v("1.0b")), Ordering::Less);
        assert_eq!(v("1.0.0-alpha").compare(&v("1.0.0-beta")), Ordering::Less);
        assert_eq!(v("1.0.0-alpha").compare(&v("1.0.0-alpha.1")), Ordering::Less);
    }

    #[test]
    fn test_build_metadata_ignored_by_ordering_but_not_equality() {
        let a = v("1.0.0+build.1");
        let b = v("1.0.0+BUILD.1");
        assert_eq!(a.compare(&b), Ordering::Equal);
        assert_ne!(a, b);
        assert_eq!(v("1.0"), v("1.0"));
        assert_ne!(v("1.0"), v("1.0.0"));
    }

    #[test]
    fn test_custom_comparer_closure() {
        let reversed = |a: &PackageVersion, b: &PackageVersion| b.compare(a);
        assert_eq!(reversed.compare(&v("1.0"), &v("2.0")), Ordering::Greater);
        assert_eq!(DefaultComparer.compare(&v("1.0"), &v("2.0")), Ordering::Less);
    }

    #[test]
    fn test_to_structured() {
        let s = v("1.2").to_structured().unwrap();
        assert_eq!((s.major, s.minor, s.build, s.revision), (1, 2, None, None));
        let s = v("1.2.3.4").to_structured().unwrap();
        assert_eq!((s.build, s.revision), (Some(3), Some(4)));
        assert_eq!(s.to_string(), "1.2.3.4");
    }

    #[test]
    fn test_to_structured_failures() {
        for bad in ["latest", "5", "1.2.3.4.5", "1.0.0-beta", "1.0.0+meta", "1.2a"] {
            assert!(
                matches!(v(bad).to_structured(), Err(Error::UnsupportedConversion { .. })),
                "{} should not convert",
                bad
            );
        }
    }

    #[test]
    fn test_from_structured() {
        let version = PackageVersion::from(StructuredVersion {
            major: 3,
            minor: 1,
            build: Some(4),
            revision: None,
        });
        assert_eq!(version.as_str(), "3.1.4");
        assert_eq!(version.scheme(), VersionScheme::SemanticVersion);
    }

    #[test]
    fn test_serde_as_string() {
        let version: PackageVersion = serde_json::from_str("\"1.2.3-rc.1\"").unwrap();
        assert_eq!(version.scheme(), VersionScheme::SemanticVersion);
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"1.2.3-rc.1\"");
        assert!(serde_json::from_str::<PackageVersion>("\"  \"").is_err());
    }
}
