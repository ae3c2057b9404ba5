//! Durable file writes.
//!
//! The manifest may only reference archives that are already on disk, so
//! every file the builder writes is flushed to stable storage before the
//! write is reported as done.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Write `bytes` to `path`, creating parent directories, and sync to disk.
pub fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Sync a directory entry so renames and creations inside it persist.
///
/// Directories cannot be opened for syncing on every platform; failures
/// there are not errors.
pub fn sync_dir(path: &Path) {
    if let Ok(dir) = File::open(path) {
        let _ = dir.sync_all();
    }
}
