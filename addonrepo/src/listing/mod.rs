//! Listing renderer.
//!
//! Renders the static, browsable view of a finished manifest:
//!
//! - `index.html` at the output root, one section per add-on
//! - `{id}/index.html`, a directory page per add-on
//! - `listing.json`, a compact machine-readable catalogue
//!
//! Output is a pure function of the manifest and [`ListingConfig`].
//! Before anything is written every referenced archive is checked on disk,
//! so a listing never links to a missing file.

mod error;
mod html;
mod index;

pub use error::RenderError;
pub use html::{escape, render_addon_page, render_index_page};
pub use index::render_listing_index;

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::config::ListingConfig;
use crate::durable::write_synced;
use crate::manifest::RepositoryManifest;
use crate::naming::{self, LISTING_FILENAME, LISTING_INDEX_FILENAME};

/// Render every listing file for `manifest` into `output_dir`.
pub fn render(
    manifest: &RepositoryManifest,
    output_dir: &Path,
    config: &ListingConfig,
) -> Result<(), RenderError> {
    check_artifacts(manifest, output_dir)?;

    write(
        &output_dir.join(LISTING_FILENAME),
        render_index_page(manifest, config).as_bytes(),
    )?;

    for (id, versions) in manifest.addons() {
        let path = naming::addon_dir(output_dir, id).join(LISTING_FILENAME);
        write(&path, render_addon_page(id, versions).as_bytes())?;
        debug!(id = %id, versions = versions.len(), "Rendered add-on page");
    }

    let index_path = output_dir.join(LISTING_INDEX_FILENAME);
    let index = render_listing_index(manifest, config).map_err(|e| RenderError::WriteFailed {
        path: index_path.clone(),
        source: io::Error::from(e),
    })?;
    write(&index_path, index.as_bytes())?;

    info!(
        addons = manifest.addon_count(),
        output = %output_dir.display(),
        "Rendered listing"
    );
    Ok(())
}

/// Check that every archive the manifest references exists with the
/// recorded size.
pub fn check_artifacts(
    manifest: &RepositoryManifest,
    output_dir: &Path,
) -> Result<(), RenderError> {
    for (id, entry) in manifest.artifacts() {
        let path = naming::resolve_artifact_path(output_dir, &entry.artifact.path);

        let metadata = match fs::metadata(&path) {
            Ok(m) if m.is_file() => m,
            _ => {
                return Err(RenderError::MissingArtifact {
                    id: id.to_string(),
                    version: entry.version.to_string(),
                    path,
                })
            }
        };

        if metadata.len() != entry.artifact.size {
            return Err(RenderError::SizeMismatch {
                path,
                expected: entry.artifact.size,
                actual: metadata.len(),
            });
        }
    }

    Ok(())
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    write_synced(path, bytes).map_err(|e| RenderError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
