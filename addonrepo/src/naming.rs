//! Centralized naming conventions for the output tree.
//!
//! This module is the single source of truth for every name the builder
//! and renderer write:
//! - Archive filenames (e.g., `plugin.video.dropout-1.2.0.zip`)
//! - Artifact paths relative to the output root
//!   (e.g., `plugin.video.dropout/plugin.video.dropout-1.2.0.zip`)
//! - Fixed files at the output root (manifest, listing)
//!
//! Names derive only from id and version, so repeated builds from identical
//! sources produce identical names.

use std::path::{Path, PathBuf};

use crate::addon::{AddonId, AddonVersion};

/// Manifest filename at the output root.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Checksum file for the manifest, in `sha256sum` format.
pub const MANIFEST_CHECKSUM_FILENAME: &str = "manifest.json.sha256";

/// Listing page filename, both at the root and inside each add-on directory.
pub const LISTING_FILENAME: &str = "index.html";

/// Secondary machine-readable listing at the output root.
pub const LISTING_INDEX_FILENAME: &str = "listing.json";

/// Archive file extension.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Generate the archive filename for an add-on version.
///
/// # Format
///
/// `{id}-{version}.zip`
///
/// # Examples
///
/// ```
/// use addonrepo::addon::{AddonId, VersionScheme};
/// use addonrepo::naming::archive_filename;
///
/// let id = AddonId::parse("plugin.video.dropout").unwrap();
/// let version = VersionScheme::Semver.parse("1.2.0").unwrap();
/// assert_eq!(archive_filename(&id, &version), "plugin.video.dropout-1.2.0.zip");
/// ```
pub fn archive_filename(id: &AddonId, version: &AddonVersion) -> String {
    format!("{}-{}.{}", id, version, ARCHIVE_EXTENSION)
}

/// Path of an archive relative to the output root, with `/` separators.
///
/// This is the form stored in the manifest and used in listing links.
pub fn artifact_path(id: &AddonId, version: &AddonVersion) -> String {
    format!("{}/{}", id, archive_filename(id, version))
}

/// Directory holding one add-on's archives, relative to the output root.
pub fn addon_dir(output_root: &Path, id: &AddonId) -> PathBuf {
    output_root.join(id.as_str())
}

/// Resolve a manifest-relative artifact path against an output root.
///
/// Manifest paths always use `/`; each segment is joined separately so
/// the result is correct on every platform.
pub fn resolve_artifact_path(output_root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(output_root.to_path_buf(), |path, segment| path.join(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::VersionScheme;

    fn id(value: &str) -> AddonId {
        AddonId::parse(value).unwrap()
    }

    fn semver(value: &str) -> AddonVersion {
        VersionScheme::Semver.parse(value).unwrap()
    }

    #[test]
    fn test_archive_filename() {
        assert_eq!(
            archive_filename(&id("sample"), &semver("1.0.0")),
            "sample-1.0.0.zip"
        );
        assert_eq!(
            archive_filename(&id("plugin.video.dropout"), &semver("2.0.0-beta.1")),
            "plugin.video.dropout-2.0.0-beta.1.zip"
        );
    }

    #[test]
    fn test_archive_filename_keeps_raw_date_token() {
        let version = VersionScheme::Date.parse("2024.3.1").unwrap();
        assert_eq!(archive_filename(&id("sample"), &version), "sample-2024.3.1.zip");
    }

    #[test]
    fn test_artifact_path() {
        assert_eq!(
            artifact_path(&id("sample"), &semver("1.2.0")),
            "sample/sample-1.2.0.zip"
        );
    }

    #[test]
    fn test_addon_dir() {
        assert_eq!(
            addon_dir(Path::new("/out"), &id("sample")),
            PathBuf::from("/out/sample")
        );
    }

    #[test]
    fn test_resolve_artifact_path() {
        assert_eq!(
            resolve_artifact_path(Path::new("/out"), "sample/sample-1.0.0.zip"),
            Path::new("/out").join("sample").join("sample-1.0.0.zip")
        );
    }

    #[test]
    fn test_naming_consistency() {
        // The archive lives in a directory named after the id
        let path = artifact_path(&id("sample"), &semver("1.0.0"));
        let name = archive_filename(&id("sample"), &semver("1.0.0"));
        assert!(path.starts_with("sample/"));
        assert!(path.ends_with(&name));
    }
}
