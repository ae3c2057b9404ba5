//! Deterministic zip archives of add-on trees.
//!
//! The archive depends only on the relative paths, contents and executable
//! bits of the packaged files. Entry order, timestamps and permissions are
//! all fixed, so an unchanged tree always produces the same bytes and the
//! same digest.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::Pattern;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::{BuildError, BuildResult};
use crate::addon::AddonId;

/// Permissions recorded for regular files.
pub const FILE_MODE: u32 = 0o644;

/// Permissions recorded for directories and executable files.
pub const EXEC_MODE: u32 = 0o755;

/// What a member of the archive is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Directory,
    File { executable: bool },
}

/// One path inside an add-on tree selected for packaging.
#[derive(Debug, Clone)]
pub struct Member {
    /// Path relative to the add-on root with `/` separators. Empty for the
    /// root itself.
    pub relative: String,

    /// Location on disk.
    pub source: PathBuf,

    pub kind: MemberKind,

    /// Modification time of files; `None` for directories.
    pub modified: Option<SystemTime>,
}

impl Member {
    /// Entry name inside the archive, under the `{id}/` prefix.
    pub fn entry_name(&self, id: &AddonId) -> String {
        match (self.kind, self.relative.is_empty()) {
            (MemberKind::Directory, true) => format!("{}/", id),
            (MemberKind::Directory, false) => format!("{}/{}/", id, self.relative),
            (MemberKind::File { .. }, _) => format!("{}/{}", id, self.relative),
        }
    }

    fn mode(&self) -> u32 {
        match self.kind {
            MemberKind::Directory | MemberKind::File { executable: true } => EXEC_MODE,
            MemberKind::File { executable: false } => FILE_MODE,
        }
    }
}

/// A finished in-memory archive.
#[derive(Debug, Clone)]
pub struct PackedArchive {
    /// Archive bytes.
    pub bytes: Vec<u8>,

    /// Number of file (non-directory) entries.
    pub file_count: usize,

    /// Newest modification time among packaged files.
    pub newest_modified: Option<SystemTime>,
}

/// Check whether a single path component matches any exclude pattern.
pub fn is_excluded(name: &str, excludes: &[Pattern]) -> bool {
    excludes.iter().any(|p| p.matches(name))
}

/// Walk an add-on tree and return the members to package, sorted by
/// relative path with the root directory first.
///
/// Excluded names are pruned (an excluded directory is not descended
/// into). Symlinks are skipped with a warning.
pub fn collect_members(root: &Path, excludes: &[Pattern]) -> BuildResult<Vec<Member>> {
    let mut members = vec![Member {
        relative: String::new(),
        source: root.to_path_buf(),
        kind: MemberKind::Directory,
        modified: None,
    }];

    walk(root, root, excludes, &mut members)?;
    members.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(members)
}

fn walk(
    root: &Path,
    dir: &Path,
    excludes: &[Pattern],
    members: &mut Vec<Member>,
) -> BuildResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| BuildError::source_read(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| BuildError::source_read(dir, e))?;
        let path = entry.path();

        let name = entry.file_name();
        let name = name.to_str().ok_or_else(|| BuildError::MalformedAddon {
            path: root.to_path_buf(),
            reason: format!("path is not valid UTF-8: {}", path.display()),
        })?;

        if is_excluded(name, excludes) {
            debug!(path = %path.display(), "Excluded from archive");
            continue;
        }

        let metadata =
            fs::symlink_metadata(&path).map_err(|e| BuildError::source_read(&path, e))?;
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            warn!(path = %path.display(), "Skipping symlink in add-on tree");
            continue;
        }

        let relative = relative_path(root, &path)?;

        if file_type.is_dir() {
            members.push(Member {
                relative,
                source: path.clone(),
                kind: MemberKind::Directory,
                modified: None,
            });
            walk(root, &path, excludes, members)?;
        } else if file_type.is_file() {
            members.push(Member {
                relative,
                source: path,
                kind: MemberKind::File {
                    executable: is_executable(&metadata),
                },
                modified: metadata.modified().ok(),
            });
        } else {
            warn!(path = %path.display(), "Skipping special file in add-on tree");
        }
    }

    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> BuildResult<String> {
    let relative = path.strip_prefix(root).map_err(|_| BuildError::MalformedAddon {
        path: root.to_path_buf(),
        reason: format!("{} escapes the add-on directory", path.display()),
    })?;

    let segments: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str().unwrap_or_default())
        .collect();
    Ok(segments.join("/"))
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

/// Build the archive for an add-on rooted at `root`.
pub fn pack(id: &AddonId, root: &Path, excludes: &[Pattern]) -> BuildResult<PackedArchive> {
    let members = collect_members(root, excludes)?;
    write_archive(id, root, &members)
}

/// Write members into a zip held in memory.
pub fn write_archive(
    id: &AddonId,
    root: &Path,
    members: &[Member],
) -> BuildResult<PackedArchive> {
    let zip_error = |reason: zip::result::ZipError| BuildError::MalformedAddon {
        path: root.to_path_buf(),
        reason: format!("failed to archive: {}", reason),
    };

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut file_count = 0;
    let mut newest_modified: Option<SystemTime> = None;

    for member in members {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(member.mode());
        let name = member.entry_name(id);

        match member.kind {
            MemberKind::Directory => {
                writer.add_directory(name, options).map_err(zip_error)?;
            }
            MemberKind::File { .. } => {
                let content = fs::read(&member.source)
                    .map_err(|e| BuildError::source_read(&member.source, e))?;
                writer.start_file(name, options).map_err(zip_error)?;
                writer.write_all(&content).map_err(|e| zip_error(e.into()))?;

                file_count += 1;
                if let Some(modified) = member.modified {
                    newest_modified = Some(newest_modified.map_or(modified, |n| n.max(modified)));
                }
            }
        }
    }

    let bytes = writer.finish().map_err(zip_error)?.into_inner();

    Ok(PackedArchive {
        bytes,
        file_count,
        newest_modified,
    })
}
