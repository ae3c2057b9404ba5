//! INI configuration file.
//!
//! ```text
//! [repository]
//! sources = addons, third_party
//! output = dist
//! title = Dropout Repository
//!
//! [build]
//! version_scheme = semver
//! jobs = 4
//! exclude = .*, __pycache__, *.pyc
//! allow_digest_change = false
//!
//! [logging]
//! level = info
//! file = logs/addonrepo.log
//! ```
//!
//! Every key is optional. Relative paths resolve against the directory the
//! file lives in.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::{Ini, Properties};
use thiserror::Error;

use crate::addon::VersionScheme;

/// Filename looked up in the working directory.
pub const CONFIG_FILENAME: &str = "addonrepo.ini";

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    #[error("invalid config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A key has an unusable value.
    #[error("invalid value for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        reason: String,
    },
}

/// `[repository]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySection {
    /// Source roots.
    pub sources: Vec<PathBuf>,
    /// Output directory.
    pub output: Option<PathBuf>,
    /// Listing title.
    pub title: Option<String>,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSection {
    pub version_scheme: Option<VersionScheme>,
    pub jobs: Option<usize>,
    pub exclude: Option<Vec<String>>,
    pub allow_digest_change: Option<bool>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSection {
    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: Option<String>,
    /// Additional log file.
    pub file: Option<PathBuf>,
}

/// Parsed configuration file. Unset keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    /// Where the configuration was loaded from, if anywhere.
    pub path: Option<PathBuf>,
    pub repository: RepositorySection,
    pub build: BuildSection,
    pub logging: LoggingSection,
}

/// Per-user configuration path (e.g., `~/.config/addonrepo/config.ini`).
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("addonrepo").join("config.ini"))
}

impl ConfigFile {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut config = Self::parse(&content, base_dir).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Find and load the first configuration that exists.
    ///
    /// Looks for `addonrepo.ini` in `working_dir`, then the per-user file.
    /// Returns the default (empty) configuration when neither exists.
    pub fn discover(working_dir: &Path) -> Result<Self, ConfigError> {
        let candidates = std::iter::once(working_dir.join(CONFIG_FILENAME)).chain(user_config_path());

        for candidate in candidates {
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// Parse configuration text, resolving relative paths against `base_dir`.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();

        if let Some(section) = ini.section(Some("repository")) {
            if let Some(sources) = value(section, "sources") {
                config.repository.sources = split_list(sources)
                    .into_iter()
                    .map(|s| base_dir.join(s))
                    .collect();
            }
            config.repository.output = value(section, "output").map(|o| base_dir.join(o));
            config.repository.title = value(section, "title").map(str::to_string);
        }

        if let Some(section) = ini.section(Some("build")) {
            if let Some(scheme) = value(section, "version_scheme") {
                config.build.version_scheme =
                    Some(scheme.parse().map_err(|reason| ConfigError::InvalidValue {
                        section: "build",
                        key: "version_scheme",
                        reason,
                    })?);
            }
            if let Some(jobs) = value(section, "jobs") {
                let jobs: usize = jobs.parse().map_err(|e| ConfigError::InvalidValue {
                    section: "build",
                    key: "jobs",
                    reason: format!("{}", e),
                })?;
                if jobs == 0 {
                    return Err(ConfigError::InvalidValue {
                        section: "build",
                        key: "jobs",
                        reason: "must be at least 1".to_string(),
                    });
                }
                config.build.jobs = Some(jobs);
            }
            config.build.exclude = value(section, "exclude").map(split_list);
            if let Some(allow) = value(section, "allow_digest_change") {
                config.build.allow_digest_change =
                    Some(parse_bool(allow).ok_or_else(|| ConfigError::InvalidValue {
                        section: "build",
                        key: "allow_digest_change",
                        reason: format!("expected true or false, got '{}'", allow),
                    })?);
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            config.logging.level = value(section, "level").map(str::to_string);
            config.logging.file = value(section, "file").map(|f| base_dir.join(f));
        }

        Ok(config)
    }
}

/// Non-empty, trimmed value of a key.
fn value<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated list, dropping empty items.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
