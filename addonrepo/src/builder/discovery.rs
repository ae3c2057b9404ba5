//! Candidate discovery and descriptor parsing.
//!
//! Add-ons are the directories directly beneath each source root, including
//! symlinks to directories. A root that carries its own `addon.ini` is a
//! single add-on instead.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{BuildError, BuildResult};
use crate::addon::{
    has_descriptor, read_descriptor, AddonDescriptor, AddonVersion, VersionScheme,
};

/// List candidate add-on directories under the given roots.
///
/// Roots are visited in the order given; directories within a root are
/// sorted by name. Hidden directories and plain files are ignored.
pub fn discover_candidates(sources: &[PathBuf]) -> BuildResult<Vec<PathBuf>> {
    let mut candidates = Vec::new();

    for root in sources {
        let metadata = fs::metadata(root).map_err(|e| BuildError::source_read(root, e))?;
        if !metadata.is_dir() {
            return Err(BuildError::source_read(
                root,
                io::Error::new(io::ErrorKind::Other, "not a directory"),
            ));
        }

        if has_descriptor(root) {
            debug!(path = %root.display(), "Source root is a single add-on");
            candidates.push(root.clone());
            continue;
        }

        let entries = fs::read_dir(root).map_err(|e| BuildError::source_read(root, e))?;

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BuildError::source_read(root, e))?;
            let path = entry.path();

            if is_hidden(&path) {
                continue;
            }

            // Follows symlinks; a dangling link is a read error.
            let metadata = fs::metadata(&path).map_err(|e| BuildError::source_read(&path, e))?;
            if metadata.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();

        debug!(
            path = %root.display(),
            count = dirs.len(),
            "Discovered add-on directories"
        );
        candidates.extend(dirs);
    }

    Ok(candidates)
}

/// Parse the descriptor of every candidate, in order.
///
/// The first candidate that fails aborts the stage.
pub fn parse_candidates(
    candidates: &[PathBuf],
    scheme: VersionScheme,
) -> BuildResult<Vec<AddonDescriptor>> {
    candidates
        .iter()
        .map(|dir| {
            read_descriptor(dir, scheme).map_err(|e| BuildError::MalformedAddon {
                path: dir.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Fail if any `(id, version)` pair is declared twice.
pub fn check_duplicates(descriptors: &[AddonDescriptor]) -> BuildResult<()> {
    let mut seen: HashMap<(&str, &AddonVersion), &Path> = HashMap::new();

    for descriptor in descriptors {
        let key = (descriptor.id.as_str(), &descriptor.version);
        if let Some(first) = seen.insert(key, &descriptor.source_path) {
            return Err(BuildError::DuplicateVersion {
                id: descriptor.id.to_string(),
                version: descriptor.version.to_string(),
                first: first.to_path_buf(),
                second: descriptor.source_path.clone(),
            });
        }
    }

    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
