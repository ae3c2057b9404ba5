//! Add-on version tokens and their ordering.
//!
//! Versions are never compared as strings: `"1.10.0"` sorts before `"1.2.0"`
//! lexicographically but after it numerically. Every version is parsed
//! under a [`VersionScheme`] into an ordering key, and all comparisons go
//! through that key.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::NaiveDate;
use semver::Version;
use serde::{Deserialize, Serialize};

/// How version tokens are parsed and ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionScheme {
    /// Semantic versioning 2.0 (`1.2.3`, `2.0.0-beta.1`).
    #[default]
    Semver,

    /// Calendar versions: `YYYY.MM.DD` with an optional `.N` build counter.
    Date,
}

impl VersionScheme {
    /// Scheme name as written in configuration and the manifest.
    pub fn name(&self) -> &'static str {
        match self {
            VersionScheme::Semver => "semver",
            VersionScheme::Date => "date",
        }
    }

    /// Parse a raw version token under this scheme.
    ///
    /// # Example
    ///
    /// ```
    /// use addonrepo::addon::VersionScheme;
    ///
    /// let older = VersionScheme::Semver.parse("1.2.0").unwrap();
    /// let newer = VersionScheme::Semver.parse("1.10.0").unwrap();
    /// assert!(older < newer);
    ///
    /// let day = VersionScheme::Date.parse("2024.03.01.2").unwrap();
    /// assert_eq!(day.as_str(), "2024.03.01.2");
    /// ```
    pub fn parse(&self, raw: &str) -> Result<AddonVersion, String> {
        let key = match self {
            VersionScheme::Semver => parse_semver(raw)?,
            VersionScheme::Date => parse_date_version(raw)?,
        };

        Ok(AddonVersion {
            raw: raw.to_string(),
            key,
        })
    }
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VersionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semver" => Ok(VersionScheme::Semver),
            "date" => Ok(VersionScheme::Date),
            other => Err(format!(
                "unknown version scheme '{}' (expected 'semver' or 'date')",
                other
            )),
        }
    }
}

/// Build metadata (`+...`) is rejected: it carries no precedence, so two
/// versions differing only there could not be ordered.
fn parse_semver(raw: &str) -> Result<VersionKey, String> {
    let version =
        Version::parse(raw).map_err(|e| format!("'{}' is not a semantic version: {}", raw, e))?;

    if !version.build.is_empty() {
        return Err(format!(
            "'{}' carries build metadata '+{}'; bump the version instead",
            raw, version.build
        ));
    }

    Ok(VersionKey::Semver(version))
}

/// Parsed ordering key.
///
/// Variants of different schemes never meet inside one repository; the
/// derived cross-variant order only keeps the ordering total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum VersionKey {
    Semver(Version),
    Date { date: NaiveDate, build: u32 },
}

fn parse_date_version(raw: &str) -> Result<VersionKey, String> {
    let invalid = |why: &str| {
        format!(
            "'{}' is not a date version (expected YYYY.MM.DD[.N]): {}",
            raw, why
        )
    };

    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(invalid("wrong number of components"));
    }
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(invalid("components must be decimal numbers"));
    }
    if parts[0].len() != 4 || parts[1].len() > 2 || parts[2].len() > 2 {
        return Err(invalid("year must have four digits, month and day at most two"));
    }

    let number = |s: &str| s.parse::<u32>().map_err(|e| invalid(&e.to_string()));
    let year = number(parts[0])? as i32;
    let month = number(parts[1])?;
    let day = number(parts[2])?;
    let build = match parts.get(3) {
        Some(n) => number(n)?,
        None => 0,
    };

    let date =
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid("no such calendar date"))?;

    Ok(VersionKey::Date { date, build })
}

/// A version token together with its parsed ordering key.
///
/// Equality, hashing and ordering use the parsed key, so `2024.3.1` and
/// `2024.03.01` are the same version. The raw token is kept verbatim for
/// file names and display.
#[derive(Debug, Clone)]
pub struct AddonVersion {
    raw: String,
    key: VersionKey,
}

impl AddonVersion {
    /// The version exactly as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The scheme this version was parsed under.
    pub fn scheme(&self) -> VersionScheme {
        match self.key {
            VersionKey::Semver(_) => VersionScheme::Semver,
            VersionKey::Date { .. } => VersionScheme::Date,
        }
    }

    /// Whether this is a pre-release (semver only).
    pub fn is_prerelease(&self) -> bool {
        match &self.key {
            VersionKey::Semver(v) => !v.pre.is_empty(),
            VersionKey::Date { .. } => false,
        }
    }
}

impl PartialEq for AddonVersion {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AddonVersion {}

impl Hash for AddonVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for AddonVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AddonVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for AddonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
