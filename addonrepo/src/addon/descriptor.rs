//! Add-on self-description (`addon.ini`).
//!
//! Every add-on directory carries an INI file at its root:
//!
//! ```text
//! [addon]
//! id = plugin.video.dropout
//! version = 1.2.0
//! name = Dropout
//! summary = Watch Dropout videos
//!
//! [requires]
//! xbmc.python = 3.0.0
//! ```
//!
//! `id` and `version` are required and validated. Everything else in
//! `[addon]` and the whole `[requires]` section is passed through to the
//! manifest untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::{AddonId, AddonVersion, VersionScheme};

/// File name of the self-description inside an add-on directory.
pub const DESCRIPTOR_FILENAME: &str = "addon.ini";

const ADDON_SECTION: &str = "addon";
const REQUIRES_SECTION: &str = "requires";

/// Reasons a self-description cannot be turned into an [`AddonDescriptor`].
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The directory has no descriptor file.
    #[error("missing {}", DESCRIPTOR_FILENAME)]
    Missing,

    /// The descriptor exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Unreadable { path: PathBuf, source: io::Error },

    /// The descriptor is not valid INI.
    #[error("{} is not valid INI: {0}", DESCRIPTOR_FILENAME)]
    Syntax(String),

    /// The `[addon]` section is absent.
    #[error("{} has no [addon] section", DESCRIPTOR_FILENAME)]
    MissingSection,

    /// A required key is absent or empty.
    #[error("{} is missing required field '{0}'", DESCRIPTOR_FILENAME)]
    MissingField(&'static str),

    /// The id is unsafe or malformed.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// The version does not parse under the configured scheme.
    #[error("invalid version: {0}")]
    InvalidVersion(String),
}

/// One installable unit at one version.
#[derive(Debug, Clone)]
pub struct AddonDescriptor {
    /// Stable identifier, unique per version within a build.
    pub id: AddonId,

    /// Declared version.
    pub version: AddonVersion,

    /// Unpackaged directory tree. Read-only to the builder.
    pub source_path: PathBuf,

    /// Remaining `[addon]` fields (name, summary, ...), passed through.
    pub metadata: BTreeMap<String, String>,

    /// `[requires]` section: add-on id to minimum version, passed through.
    pub requires: BTreeMap<String, String>,
}

impl AddonDescriptor {
    /// Human-facing name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.metadata
            .get("name")
            .map(String::as_str)
            .unwrap_or_else(|| self.id.as_str())
    }
}

impl fmt::Display for AddonDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.id, self.version)
    }
}

/// Check whether a directory carries a descriptor file.
pub fn has_descriptor(dir: &Path) -> bool {
    dir.join(DESCRIPTOR_FILENAME).is_file()
}

/// Read and parse the descriptor of the add-on rooted at `dir`.
pub fn read_descriptor(
    dir: &Path,
    scheme: VersionScheme,
) -> Result<AddonDescriptor, DescriptorError> {
    let path = dir.join(DESCRIPTOR_FILENAME);
    let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DescriptorError::Missing,
        _ => DescriptorError::Unreadable {
            path: path.clone(),
            source: e,
        },
    })?;

    parse_descriptor(&content, dir, scheme)
}

/// Parse descriptor text for the add-on rooted at `source_path`.
pub fn parse_descriptor(
    content: &str,
    source_path: &Path,
    scheme: VersionScheme,
) -> Result<AddonDescriptor, DescriptorError> {
    let ini = Ini::load_from_str(content).map_err(|e| DescriptorError::Syntax(e.to_string()))?;

    let section = ini
        .section(Some(ADDON_SECTION))
        .ok_or(DescriptorError::MissingSection)?;

    let required = |key: &'static str| {
        section
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(DescriptorError::MissingField(key))
    };

    let id = AddonId::parse(required("id")?).map_err(DescriptorError::InvalidId)?;
    let version = scheme
        .parse(required("version")?)
        .map_err(DescriptorError::InvalidVersion)?;

    let metadata = section
        .iter()
        .filter(|(key, _)| *key != "id" && *key != "version")
        .map(|(key, value)| (key.to_string(), value.trim().to_string()))
        .collect();

    let requires = ini
        .section(Some(REQUIRES_SECTION))
        .map(|deps| {
            deps.iter()
                .map(|(key, value)| (key.to_string(), value.trim().to_string()))
                .collect()
        })
        .unwrap_or_default();

    Ok(AddonDescriptor {
        id,
        version,
        source_path: source_path.to_path_buf(),
        metadata,
        requires,
    })
}
