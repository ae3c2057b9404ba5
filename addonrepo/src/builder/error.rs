//! Error types for the manifest builder.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::listing::RenderError;

/// Result type for builder operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that can occur while building a repository.
///
/// Every variant aborts the whole build. Nothing is published and nothing
/// is retried; each variant carries the path (and id/version where known)
/// needed to act on it from the command line.
#[derive(Debug, Error)]
pub enum BuildError {
    /// An add-on directory has a missing or unparseable self-description.
    #[error("malformed add-on at {}: {reason}", path.display())]
    MalformedAddon { path: PathBuf, reason: String },

    /// Two source directories declare the same id and version.
    #[error(
        "duplicate add-on {id} {version}: declared by both {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateVersion {
        id: String,
        version: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A version already published in the output directory was rebuilt
    /// with different content.
    #[error(
        "{id} {version} is already published with sha256 {previous}, but the rebuilt \
         archive has sha256 {current}; bump the version"
    )]
    DigestChanged {
        id: String,
        version: String,
        previous: String,
        current: String,
    },

    /// The output directory (or a file in it) could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    OutputWrite { path: PathBuf, source: io::Error },

    /// A source root or a file inside an add-on could not be read.
    #[error("failed to read {}: {source}", path.display())]
    SourceRead { path: PathBuf, source: io::Error },

    /// A manifest on disk could not be parsed.
    #[error("invalid manifest at {}: {reason}", path.display())]
    ManifestFormat { path: PathBuf, reason: String },

    /// The build configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Rendering the listing into the staged tree failed.
    #[error("listing render failed: {0}")]
    Render(#[from] RenderError),
}

impl BuildError {
    /// Wrap an I/O failure on an output path.
    pub(crate) fn output(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::OutputWrite {
            path: path.into(),
            source,
        }
    }

    /// Wrap an I/O failure on a source path.
    pub(crate) fn source_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::SourceRead {
            path: path.into(),
            source,
        }
    }
}
