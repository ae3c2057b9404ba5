//! Integrity check for a published output directory.
//!
//! Reads the manifest independently of any build and confirms the tree
//! still matches it: the manifest checksum file, and every archive's
//! presence, size and digest.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::builder::{BuildError, BuildResult};
use crate::checksum::{calculate_file_checksum, parse_checksum_line, sha256_hex};
use crate::manifest::RepositoryManifest;
use crate::naming::{self, MANIFEST_CHECKSUM_FILENAME, MANIFEST_FILENAME};

/// One discrepancy found by [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// `manifest.json.sha256` is absent or unreadable.
    ManifestChecksumMissing,

    /// `manifest.json` does not match its checksum file.
    ManifestChecksumMismatch { expected: String, actual: String },

    /// An archive listed in the manifest is absent.
    MissingArtifact { path: PathBuf },

    /// An archive differs in size from the manifest.
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// An archive differs in content from the manifest.
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::ManifestChecksumMissing => {
                write!(f, "{} is missing or malformed", MANIFEST_CHECKSUM_FILENAME)
            }
            Problem::ManifestChecksumMismatch { expected, actual } => write!(
                f,
                "{} checksum mismatch: expected {}, got {}",
                MANIFEST_FILENAME, expected, actual
            ),
            Problem::MissingArtifact { path } => write!(f, "missing {}", path.display()),
            Problem::SizeMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "{}: expected {} bytes, found {}",
                path.display(),
                expected,
                actual
            ),
            Problem::DigestMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "{}: expected sha256 {}, got {}",
                path.display(),
                expected,
                actual
            ),
        }
    }
}

/// Result of verifying an output directory.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// The manifest that was checked against.
    pub manifest: RepositoryManifest,

    /// Number of archives checked.
    pub checked: usize,

    /// Everything that did not match, in manifest order.
    pub problems: Vec<Problem>,
}

impl VerifyReport {
    /// Whether the tree matches its manifest exactly.
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Verify the output directory against its manifest.
///
/// Fails only if the manifest itself cannot be loaded; every other
/// discrepancy is collected into the report.
pub fn verify(output_dir: &Path) -> BuildResult<VerifyReport> {
    let manifest_path = output_dir.join(MANIFEST_FILENAME);
    let manifest_bytes =
        fs::read(&manifest_path).map_err(|e| BuildError::source_read(&manifest_path, e))?;
    let content = String::from_utf8(manifest_bytes).map_err(|e| BuildError::ManifestFormat {
        path: manifest_path.clone(),
        reason: e.to_string(),
    })?;
    let manifest = RepositoryManifest::from_json(&content, &manifest_path)?;

    let mut problems = Vec::new();
    if let Some(problem) = check_manifest_checksum(output_dir, content.as_bytes()) {
        problems.push(problem);
    }

    let entries: Vec<_> = manifest.artifacts().collect();
    let artifact_problems: Vec<Option<Problem>> = entries
        .par_iter()
        .map(|(_, entry)| {
            check_artifact(
                &naming::resolve_artifact_path(output_dir, &entry.artifact.path),
                entry.artifact.size,
                &entry.artifact.sha256,
            )
        })
        .collect();
    problems.extend(artifact_problems.into_iter().flatten());

    let checked = entries.len();
    info!(
        checked,
        problems = problems.len(),
        output = %output_dir.display(),
        "Verified output directory"
    );

    Ok(VerifyReport {
        manifest,
        checked,
        problems,
    })
}

fn check_manifest_checksum(output_dir: &Path, manifest_bytes: &[u8]) -> Option<Problem> {
    let recorded = fs::read_to_string(output_dir.join(MANIFEST_CHECKSUM_FILENAME)).ok();
    let Some(expected) = recorded.as_deref().and_then(parse_checksum_line) else {
        return Some(Problem::ManifestChecksumMissing);
    };

    let actual = sha256_hex(manifest_bytes);
    if actual != expected {
        return Some(Problem::ManifestChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    None
}

fn check_artifact(path: &Path, size: u64, sha256: &str) -> Option<Problem> {
    let metadata = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => {
            return Some(Problem::MissingArtifact {
                path: path.to_path_buf(),
            })
        }
    };

    if metadata.len() != size {
        return Some(Problem::SizeMismatch {
            path: path.to_path_buf(),
            expected: size,
            actual: metadata.len(),
        });
    }

    let actual = match calculate_file_checksum(path) {
        Ok(digest) => digest,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Failed to hash archive");
            return Some(Problem::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
    };

    if actual != sha256 {
        return Some(Problem::DigestMismatch {
            path: path.to_path_buf(),
            expected: sha256.to_string(),
            actual,
        });
    }
    None
}
