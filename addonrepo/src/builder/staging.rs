//! Staging directory and atomic replacement of the output directory.
//!
//! A build writes into a hidden temporary sibling of the output directory.
//! Only [`Staging::commit`] touches the output itself: the previous tree is
//! moved aside, the staged tree is renamed into place, and the previous
//! tree is deleted. Dropping an uncommitted `Staging` removes the staged
//! tree and leaves the output untouched.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

use super::{BuildError, BuildResult};
use crate::durable::sync_dir;

const STAGING_PREFIX: &str = ".addonrepo-staging-";
const PREVIOUS_PREFIX: &str = ".addonrepo-previous-";

/// A staged output tree waiting to be committed.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    output_dir: PathBuf,
}

impl Staging {
    /// Create a staging directory next to `output_dir`.
    ///
    /// The parent of `output_dir` is created if needed. Staging on the same
    /// filesystem keeps the final rename atomic.
    pub fn create(output_dir: &Path) -> BuildResult<Self> {
        let parent = parent_of(output_dir);
        fs::create_dir_all(&parent).map_err(|e| BuildError::output(&parent, e))?;

        let dir = Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| BuildError::output(&parent, e))?;

        set_public_permissions(dir.path())?;
        debug!(path = %dir.path().display(), "Created staging directory");

        Ok(Self {
            dir,
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// The staged tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Replace the output directory with the staged tree.
    pub fn commit(self) -> BuildResult<()> {
        let parent = parent_of(&self.output_dir);

        let previous = if fs::symlink_metadata(&self.output_dir).is_ok() {
            let holder = Builder::new()
                .prefix(PREVIOUS_PREFIX)
                .tempdir_in(&parent)
                .map_err(|e| BuildError::output(&parent, e))?;
            let aside = holder.path().join("output");
            fs::rename(&self.output_dir, &aside)
                .map_err(|e| BuildError::output(&self.output_dir, e))?;
            Some((holder, aside))
        } else {
            None
        };

        if let Err(e) = fs::rename(self.dir.path(), &self.output_dir) {
            if let Some((_, aside)) = &previous {
                if let Err(restore) = fs::rename(aside, &self.output_dir) {
                    warn!(
                        path = %aside.display(),
                        error = %restore,
                        "Failed to restore previous output directory"
                    );
                }
            }
            return Err(BuildError::output(&self.output_dir, e));
        }

        sync_dir(&parent);
        debug!(path = %self.output_dir.display(), "Committed output directory");

        // Dropping the holder removes the previous tree. The staging
        // TempDir now points at a path that no longer exists; its drop is a
        // no-op.
        drop(previous);
        Ok(())
    }
}

fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(unix)]
fn set_public_permissions(path: &Path) -> BuildResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| BuildError::output(path, e))
}

#[cfg(not(unix))]
fn set_public_permissions(_path: &Path) -> BuildResult<()> {
    Ok(())
}
