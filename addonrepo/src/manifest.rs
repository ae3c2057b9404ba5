//! The repository manifest: the installer-facing index of every add-on,
//! version and archive in a build.
//!
//! On disk the manifest is pretty-printed JSON at `manifest.json` in the
//! output root, accompanied by `manifest.json.sha256`:
//!
//! ```text
//! {
//!   "schema_version": 1,
//!   "generated_at": "2024-05-01T12:00:00Z",
//!   "version_scheme": "semver",
//!   "addons": {
//!     "sample": [
//!       {
//!         "version": "1.0.0",
//!         "metadata": { "name": "Sample" },
//!         "requires": {},
//!         "artifact": {
//!           "file_name": "sample-1.0.0.zip",
//!           "path": "sample/sample-1.0.0.zip",
//!           "sha256": "…",
//!           "size": 1234
//!         }
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! Add-ons appear in id order and versions in ascending order, so the same
//! manifest value always serializes to the same bytes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::addon::{AddonId, AddonVersion, VersionScheme};
use crate::builder::{BuildError, BuildResult};
use crate::checksum::{checksum_line, is_sha256_hex, sha256_hex};
use crate::durable::write_synced;
use crate::naming::{self, MANIFEST_CHECKSUM_FILENAME, MANIFEST_FILENAME};

/// Current manifest schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// The packaged output for one add-on version.
///
/// Created once per build per descriptor and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveArtifact {
    /// Archive filename (e.g., `sample-1.0.0.zip`).
    pub file_name: String,

    /// Path relative to the output root, `/`-separated.
    pub path: String,

    /// SHA-256 of the archive bytes, lowercase hex.
    pub sha256: String,

    /// Archive size in bytes.
    pub size: u64,
}

/// One version of one add-on in the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// The add-on version.
    pub version: AddonVersion,

    /// Pass-through descriptor fields.
    pub metadata: BTreeMap<String, String>,

    /// Pass-through dependency declarations.
    pub requires: BTreeMap<String, String>,

    /// The archive for this version.
    pub artifact: ArchiveArtifact,
}

impl ManifestEntry {
    /// Declared human-facing name, if any.
    pub fn name(&self) -> Option<&str> {
        self.metadata.get("name").map(String::as_str)
    }

    /// Declared one-line summary, if any.
    pub fn summary(&self) -> Option<&str> {
        self.metadata.get("summary").map(String::as_str)
    }
}

/// The aggregate index of all add-ons in a build.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryManifest {
    generated_at: DateTime<Utc>,
    version_scheme: VersionScheme,
    entries: BTreeMap<AddonId, Vec<ManifestEntry>>,
}

impl RepositoryManifest {
    /// Create an empty manifest.
    pub fn new(generated_at: DateTime<Utc>, version_scheme: VersionScheme) -> Self {
        Self {
            generated_at,
            version_scheme,
            entries: BTreeMap::new(),
        }
    }

    /// When the build was generated.
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// The scheme all versions were parsed under.
    pub fn version_scheme(&self) -> VersionScheme {
        self.version_scheme
    }

    /// Insert an entry, keeping versions ascending.
    ///
    /// Returns `false` (and leaves the manifest unchanged) if the id already
    /// has an entry for this version.
    pub fn insert(&mut self, id: AddonId, entry: ManifestEntry) -> bool {
        let versions = self.entries.entry(id).or_default();
        match versions.binary_search_by(|e| e.version.cmp(&entry.version)) {
            Ok(_) => false,
            Err(position) => {
                versions.insert(position, entry);
                true
            }
        }
    }

    /// Iterate add-ons in id order with their versions ascending.
    pub fn addons(&self) -> impl Iterator<Item = (&AddonId, &[ManifestEntry])> {
        self.entries.iter().map(|(id, v)| (id, v.as_slice()))
    }

    /// All versions of one add-on, ascending.
    pub fn versions(&self, id: &AddonId) -> Option<&[ManifestEntry]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    /// The newest version of one add-on.
    pub fn latest(&self, id: &AddonId) -> Option<&ManifestEntry> {
        self.entries.get(id).and_then(|v| v.last())
    }

    /// Look up one specific version.
    pub fn find(&self, id: &AddonId, version: &AddonVersion) -> Option<&ManifestEntry> {
        self.entries
            .get(id)
            .and_then(|v| v.iter().find(|e| &e.version == version))
    }

    /// Iterate every entry in id order, versions ascending.
    pub fn artifacts(&self) -> impl Iterator<Item = (&AddonId, &ManifestEntry)> {
        self.entries
            .iter()
            .flat_map(|(id, versions)| versions.iter().map(move |e| (id, e)))
    }

    /// Number of distinct add-ons.
    pub fn addon_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of archives referenced.
    pub fn artifact_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Total size of all referenced archives.
    pub fn total_size(&self) -> u64 {
        self.artifacts().map(|(_, e)| e.artifact.size).sum()
    }

    /// Whether the manifest lists nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the on-disk JSON form (with trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let document = ManifestDocument {
            schema_version: SCHEMA_VERSION,
            generated_at: format_timestamp(self.generated_at),
            version_scheme: self.version_scheme,
            addons: self
                .entries
                .iter()
                .map(|(id, versions)| {
                    let entries = versions
                        .iter()
                        .map(|e| EntryDocument {
                            version: e.version.as_str().to_string(),
                            metadata: e.metadata.clone(),
                            requires: e.requires.clone(),
                            artifact: e.artifact.clone(),
                        })
                        .collect();
                    (id.as_str().to_string(), entries)
                })
                .collect(),
        };

        let mut json = serde_json::to_string_pretty(&document)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse the on-disk JSON form.
    ///
    /// Versions are re-parsed under the recorded scheme, and every artifact
    /// path and file name must be the ones naming rules derive from id and
    /// version.
    /// `origin` is only used in error messages.
    pub fn from_json(content: &str, origin: &Path) -> BuildResult<Self> {
        let invalid = |reason: String| BuildError::ManifestFormat {
            path: origin.to_path_buf(),
            reason,
        };

        let document: ManifestDocument =
            serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;

        if document.schema_version != SCHEMA_VERSION {
            return Err(invalid(format!(
                "unsupported schema version {} (expected {})",
                document.schema_version, SCHEMA_VERSION
            )));
        }

        let generated_at = DateTime::parse_from_rfc3339(&document.generated_at)
            .map_err(|e| invalid(format!("invalid timestamp: {}", e)))?
            .with_timezone(&Utc);

        let scheme = document.version_scheme;
        let mut manifest = Self::new(generated_at, scheme);

        for (raw_id, entries) in document.addons {
            let id = AddonId::parse(raw_id).map_err(invalid)?;

            for entry in entries {
                let version = scheme.parse(&entry.version).map_err(invalid)?;

                let expected_path = naming::artifact_path(&id, &version);
                if entry.artifact.path != expected_path {
                    return Err(invalid(format!(
                        "artifact path '{}' for {} {} should be '{}'",
                        entry.artifact.path, id, version, expected_path
                    )));
                }
                let expected_name = naming::archive_filename(&id, &version);
                if entry.artifact.file_name != expected_name {
                    return Err(invalid(format!(
                        "artifact file name '{}' for {} {} should be '{}'",
                        entry.artifact.file_name, id, version, expected_name
                    )));
                }
                if !is_sha256_hex(&entry.artifact.sha256) {
                    return Err(invalid(format!(
                        "artifact digest for {} {} is not a SHA-256 hex string",
                        id, version
                    )));
                }

                let inserted = manifest.insert(
                    id.clone(),
                    ManifestEntry {
                        version: version.clone(),
                        metadata: entry.metadata,
                        requires: entry.requires,
                        artifact: entry.artifact,
                    },
                );
                if !inserted {
                    return Err(invalid(format!("duplicate entry for {} {}", id, version)));
                }
            }
        }

        Ok(manifest)
    }

    /// Write `manifest.json` and its checksum file into `dir`.
    ///
    /// Both files are synced to disk before returning. Returns the path of
    /// the manifest.
    pub fn write(&self, dir: &Path) -> BuildResult<PathBuf> {
        let path = dir.join(MANIFEST_FILENAME);
        let json = self.to_json().map_err(|e| BuildError::ManifestFormat {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        write_synced(&path, json.as_bytes()).map_err(|e| BuildError::output(&path, e))?;

        let checksum_path = dir.join(MANIFEST_CHECKSUM_FILENAME);
        let line = checksum_line(&sha256_hex(json.as_bytes()), MANIFEST_FILENAME);
        write_synced(&checksum_path, line.as_bytes())
            .map_err(|e| BuildError::output(&checksum_path, e))?;

        Ok(path)
    }

    /// Load `manifest.json` from an output directory.
    pub fn load(dir: &Path) -> BuildResult<Self> {
        let path = dir.join(MANIFEST_FILENAME);
        let content =
            fs::read_to_string(&path).map_err(|e| BuildError::source_read(&path, e))?;
        Self::from_json(&content, &path)
    }
}

/// Format a timestamp the way the manifest stores it.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Serialize, Deserialize)]
struct ManifestDocument {
    schema_version: u32,
    generated_at: String,
    version_scheme: VersionScheme,
    addons: BTreeMap<String, Vec<EntryDocument>>,
}

#[derive(Serialize, Deserialize)]
struct EntryDocument {
    version: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    requires: BTreeMap<String, String>,
    artifact: ArchiveArtifact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn entry(id: &str, version: &str) -> (AddonId, ManifestEntry) {
        let id = AddonId::parse(id).unwrap();
        let version = VersionScheme::Semver.parse(version).unwrap();
        let artifact = ArchiveArtifact {
            file_name: naming::archive_filename(&id, &version),
            path: naming::artifact_path(&id, &version),
            sha256: sha256_hex(version.as_str().as_bytes()),
            size: 100,
        };
        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), format!("{} name", id));
        (
            id,
            ManifestEntry {
                version,
                metadata,
                requires: BTreeMap::new(),
                artifact,
            },
        )
    }

    fn sample_manifest() -> RepositoryManifest {
        let mut manifest = RepositoryManifest::new(timestamp(), VersionScheme::Semver);
        for (id, version) in [
            ("sample", "1.2.0"),
            ("sample", "1.0.0"),
            ("sample", "1.10.0"),
            ("another", "0.1.0"),
        ] {
            let (id, e) = entry(id, version);
            assert!(manifest.insert(id, e));
        }
        manifest
    }

    #[test]
    fn test_insert_keeps_versions_ascending() {
        let manifest = sample_manifest();
        let id = AddonId::parse("sample").unwrap();

        let versions: Vec<&str> = manifest
            .versions(&id)
            .unwrap()
            .iter()
            .map(|e| e.version.as_str())
            .collect();
        assert_eq!(versions, vec!["1.0.0", "1.2.0", "1.10.0"]);
        assert_eq!(manifest.latest(&id).unwrap().version.as_str(), "1.10.0");
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut manifest = sample_manifest();
        let (id, e) = entry("sample", "1.2.0");
        assert!(!manifest.insert(id, e));
        assert_eq!(manifest.artifact_count(), 4);
    }

    #[test]
    fn test_counts_and_order() {
        let manifest = sample_manifest();
        assert_eq!(manifest.addon_count(), 2);
        assert_eq!(manifest.artifact_count(), 4);
        assert_eq!(manifest.total_size(), 400);
        assert!(!manifest.is_empty());

        let ids: Vec<&str> = manifest.addons().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["another", "sample"]);
    }

    #[test]
    fn test_find() {
        let manifest = sample_manifest();
        let id = AddonId::parse("sample").unwrap();
        let version = VersionScheme::Semver.parse("1.2.0").unwrap();
        let found = manifest.find(&id, &version).unwrap();
        assert_eq!(found.artifact.file_name, "sample-1.2.0.zip");
        assert_eq!(found.name(), Some("sample name"));
        assert_eq!(found.summary(), None);
    }

    #[test]
    fn test_json_shape() {
        let json = sample_manifest().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["generated_at"], "2024-05-01T12:00:00Z");
        assert_eq!(value["version_scheme"], "semver");
        assert_eq!(value["addons"]["sample"][0]["version"], "1.0.0");
        assert_eq!(
            value["addons"]["sample"][2]["artifact"]["path"],
            "sample/sample-1.10.0.zip"
        );
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_json_is_deterministic() {
        assert_eq!(
            sample_manifest().to_json().unwrap(),
            sample_manifest().to_json().unwrap()
        );
    }

    #[test]
    fn test_parse_written_manifest() {
        let original = sample_manifest();
        let json = original.to_json().unwrap();
        let parsed = RepositoryManifest::from_json(&json, Path::new("manifest.json")).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_from_json_rejects_unknown_schema() {
        let json = sample_manifest()
            .to_json()
            .unwrap()
            .replace("\"schema_version\": 1", "\"schema_version\": 2");
        let err = RepositoryManifest::from_json(&json, Path::new("m.json")).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn test_from_json_rejects_escaping_path() {
        let json = sample_manifest()
            .to_json()
            .unwrap()
            .replace("another/another-0.1.0.zip", "../another-0.1.0.zip");
        let err = RepositoryManifest::from_json(&json, Path::new("m.json")).unwrap_err();
        assert!(matches!(err, BuildError::ManifestFormat { .. }));
    }

    #[test]
    fn test_from_json_rejects_mismatched_file_name() {
        let json = sample_manifest()
            .to_json()
            .unwrap()
            .replace("\"file_name\": \"sample-1.2.0.zip\"", "\"file_name\": \"missing.zip\"");
        let err = RepositoryManifest::from_json(&json, Path::new("m.json")).unwrap_err();
        match err {
            BuildError::ManifestFormat { reason, .. } => {
                assert!(reason.contains("missing.zip"));
                assert!(reason.contains("sample-1.2.0.zip"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = RepositoryManifest::from_json("{not json", Path::new("m.json")).unwrap_err();
        assert!(err.to_string().contains("m.json"));
    }

    #[test]
    fn test_write_and_load() {
        let temp = TempDir::new().unwrap();
        let manifest = sample_manifest();

        let path = manifest.write(temp.path()).unwrap();
        assert_eq!(path, temp.path().join(MANIFEST_FILENAME));

        let checksum = fs::read_to_string(temp.path().join(MANIFEST_CHECKSUM_FILENAME)).unwrap();
        let json = fs::read(&path).unwrap();
        assert_eq!(checksum, checksum_line(&sha256_hex(&json), MANIFEST_FILENAME));

        let loaded = RepositoryManifest::load(temp.path()).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_load_missing() {
        let temp = TempDir::new().unwrap();
        let err = RepositoryManifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, BuildError::SourceRead { .. }));
    }
}
