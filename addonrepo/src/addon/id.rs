//! Add-on identifiers.
//!
//! An id ends up as a directory name in the output tree, as the prefix of
//! every archive file name, and as a URL path segment on the listing page.
//! Only characters that are safe in all three places are accepted.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum length of an add-on id in bytes.
pub const MAX_ID_LEN: usize = 128;

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid add-on id pattern")
    })
}

/// A validated add-on identifier.
///
/// # Example
///
/// ```
/// use addonrepo::addon::AddonId;
///
/// let id = AddonId::parse("plugin.video.dropout").unwrap();
/// assert_eq!(id.as_str(), "plugin.video.dropout");
///
/// assert!(AddonId::parse("../escape").is_err());
/// assert!(AddonId::parse("with space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddonId(String);

impl AddonId {
    /// Validate and wrap an id.
    ///
    /// Returns a human-readable reason on rejection.
    pub fn parse(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();

        if value.is_empty() {
            return Err("id is empty".to_string());
        }
        if value.len() > MAX_ID_LEN {
            return Err(format!(
                "id is {} bytes long, the limit is {}",
                value.len(),
                MAX_ID_LEN
            ));
        }
        if !id_pattern().is_match(&value) {
            return Err(format!(
                "id '{}' contains characters unsafe for a file name or URL \
                 (allowed: letters, digits, '.', '_', '-'; must start with a letter or digit)",
                value
            ));
        }

        Ok(Self(value))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AddonId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AddonId> for String {
    fn from(id: AddonId) -> Self {
        id.0
    }
}

impl AsRef<str> for AddonId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_kodi_style_ids() {
        for id in [
            "plugin.video.dropout",
            "repository.dropout",
            "script.module.requests",
            "a",
            "Addon_2-beta",
        ] {
            assert!(AddonId::parse(id).is_ok(), "{} should be valid", id);
        }
    }

    #[test]
    fn test_rejects_empty() {
        let err = AddonId::parse("").unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_rejects_path_traversal() {
        assert!(AddonId::parse("..").is_err());
        assert!(AddonId::parse(".").is_err());
        assert!(AddonId::parse("../etc").is_err());
        assert!(AddonId::parse("a/b").is_err());
        assert!(AddonId::parse("a\\b").is_err());
    }

    #[test]
    fn test_rejects_url_unsafe_characters() {
        for id in ["with space", "q?x", "hash#tag", "per%cent", "amp&", "ümlaut"] {
            assert!(AddonId::parse(id).is_err(), "{} should be rejected", id);
        }
    }

    #[test]
    fn test_rejects_leading_punctuation() {
        assert!(AddonId::parse(".hidden").is_err());
        assert!(AddonId::parse("-flag").is_err());
        assert!(AddonId::parse("_under").is_err());
    }

    #[test]
    fn test_rejects_overlong() {
        let id = "a".repeat(MAX_ID_LEN + 1);
        assert!(AddonId::parse(id).is_err());
        assert!(AddonId::parse("a".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let id: AddonId = serde_json::from_str("\"plugin.video.dropout\"").unwrap();
        assert_eq!(id.as_str(), "plugin.video.dropout");

        let bad: Result<AddonId, _> = serde_json::from_str("\"../x\"");
        assert!(bad.is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_valid_ids_are_single_safe_segments(id in "[A-Za-z0-9][A-Za-z0-9._-]{0,40}") {
                let parsed = AddonId::parse(id.clone());
                prop_assert!(parsed.is_ok());
                prop_assert!(!id.contains('/'));
                prop_assert!(id != "." && id != "..");
            }

            #[test]
            fn test_ids_with_separators_rejected(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
                let with_slash = format!("{}/{}", a, b);
                prop_assert!(AddonId::parse(with_slash).is_err());
            }
        }
    }
}
