//! Error types for the listing renderer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while rendering the listing.
///
/// A missing or mismatched artifact means an earlier stage broke the
/// manifest invariant. It is a bug signal, not a recoverable condition.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The manifest references an archive that is not on disk.
    #[error("manifest references {id} {version} at {}, but the file does not exist", path.display())]
    MissingArtifact {
        id: String,
        version: String,
        path: PathBuf,
    },

    /// An archive on disk differs in size from the manifest.
    #[error("size mismatch for {}: manifest says {expected} bytes, file has {actual}", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Writing a listing file failed.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },
}
