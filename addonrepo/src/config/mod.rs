//! Configuration for builds and listings.
//!
//! [`BuildConfig`] and [`ListingConfig`] are plain values passed explicitly
//! into the builder and renderer; nothing in the library reads process
//! state. [`ConfigFile`] loads optional defaults from an INI file for the
//! command line to merge with its own arguments.

mod file;

pub use file::{user_config_path, ConfigError, ConfigFile, CONFIG_FILENAME};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use glob::Pattern;

use crate::addon::VersionScheme;
use crate::builder::{BuildError, BuildResult};

/// Path components skipped when archiving, unless overridden.
pub const DEFAULT_EXCLUDES: &[&str] = &[".*", "__pycache__", "*.pyc", "*.pyo"];

/// Default listing page title.
pub const DEFAULT_TITLE: &str = "Add-on Repository";

/// Default worker count: one per available CPU.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Everything a build needs.
///
/// # Example
///
/// ```
/// use addonrepo::addon::VersionScheme;
/// use addonrepo::config::BuildConfig;
///
/// let config = BuildConfig::new(vec!["addons".into()], "dist")
///     .with_jobs(2)
///     .with_version_scheme(VersionScheme::Date);
/// assert_eq!(config.jobs, 2);
/// ```
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Source roots; add-ons are the directories directly beneath each.
    pub sources: Vec<PathBuf>,

    /// Output directory, replaced atomically on success.
    pub output_dir: PathBuf,

    /// How version tokens are parsed and ordered.
    pub version_scheme: VersionScheme,

    /// Maximum number of add-ons archived concurrently.
    pub jobs: usize,

    /// Glob patterns matched against each path component inside an add-on.
    pub exclude: Vec<String>,

    /// Fixed build timestamp. When unset, the newest modification time of
    /// any packaged file is used.
    pub generated_at: Option<DateTime<Utc>>,

    /// Replace already-published archives whose content changed instead of
    /// failing the build.
    pub allow_digest_change: bool,
}

impl BuildConfig {
    /// Create a config with default scheme, jobs and excludes.
    pub fn new(sources: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            output_dir: output_dir.into(),
            version_scheme: VersionScheme::default(),
            jobs: default_jobs(),
            exclude: DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect(),
            generated_at: None,
            allow_digest_change: false,
        }
    }

    /// Set the version scheme.
    pub fn with_version_scheme(mut self, scheme: VersionScheme) -> Self {
        self.version_scheme = scheme;
        self
    }

    /// Set the worker count.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Replace the exclude patterns.
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Pin the build timestamp.
    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    /// Allow or forbid republishing a version with different content.
    pub fn with_allow_digest_change(mut self, allow: bool) -> Self {
        self.allow_digest_change = allow;
        self
    }

    /// Compile the exclude patterns.
    pub fn exclude_patterns(&self) -> BuildResult<Vec<Pattern>> {
        self.exclude
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    BuildError::InvalidConfig(format!("invalid exclude pattern '{}': {}", p, e))
                })
            })
            .collect()
    }

    /// Check the configuration before anything is touched.
    ///
    /// Besides the obvious checks this refuses layouts where replacing the
    /// output directory would remove or re-package a source.
    pub fn validate(&self) -> BuildResult<()> {
        if self.sources.is_empty() {
            return Err(BuildError::InvalidConfig(
                "no source directories given".to_string(),
            ));
        }
        if self.jobs == 0 {
            return Err(BuildError::InvalidConfig(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(BuildError::InvalidConfig(
                "output directory is empty".to_string(),
            ));
        }
        self.exclude_patterns()?;

        let output = normalize(&self.output_dir);
        for source in &self.sources {
            let source = normalize(source);
            if source.starts_with(&output) {
                return Err(BuildError::InvalidConfig(format!(
                    "output directory {} contains source {}; replacing it would destroy the source",
                    output.display(),
                    source.display()
                )));
            }
            if output.starts_with(&source) {
                return Err(BuildError::InvalidConfig(format!(
                    "output directory {} is inside source {}",
                    output.display(),
                    source.display()
                )));
            }
        }

        Ok(())
    }
}

/// Resolve a path as far as the filesystem allows.
///
/// The output directory may not exist yet, so fall back to resolving its
/// parent and re-appending the final component.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            fs::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// Settings for the listing renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingConfig {
    /// Page title and heading.
    pub title: String,
}

impl ListingConfig {
    /// Create a listing config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::new(vec![PathBuf::from("addons")], "dist");
        assert_eq!(config.version_scheme, VersionScheme::Semver);
        assert!(config.jobs >= 1);
        assert_eq!(config.exclude.len(), DEFAULT_EXCLUDES.len());
        assert!(config.generated_at.is_none());
        assert!(!config.allow_digest_change);
        assert_eq!(ListingConfig::default().title, DEFAULT_TITLE);
    }

    #[test]
    fn test_validate_ok() {
        let temp = TempDir::new().unwrap();
        let sources = temp.path().join("addons");
        fs::create_dir_all(&sources).unwrap();

        let config = BuildConfig::new(vec![sources], temp.path().join("dist"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_no_sources() {
        let config = BuildConfig::new(Vec::new(), "dist");
        assert!(matches!(config.validate(), Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_jobs() {
        let config = BuildConfig::new(vec![PathBuf::from("a")], "dist").with_jobs(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jobs"));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let config =
            BuildConfig::new(vec![PathBuf::from("a")], "dist").with_exclude(vec!["[".to_string()]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exclude pattern"));
    }

    #[test]
    fn test_validate_rejects_output_over_source() {
        let temp = TempDir::new().unwrap();
        let sources = temp.path().join("repo").join("addons");
        fs::create_dir_all(&sources).unwrap();

        let config = BuildConfig::new(vec![sources], temp.path().join("repo"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("destroy the source"));
    }

    #[test]
    fn test_validate_rejects_output_inside_source() {
        let temp = TempDir::new().unwrap();
        let sources = temp.path().join("addons");
        fs::create_dir_all(&sources).unwrap();

        let config = BuildConfig::new(vec![sources.clone()], sources.join("dist"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("inside source"));
    }

    #[test]
    fn test_normalize_nonexistent_child() {
        let temp = TempDir::new().unwrap();
        let resolved = normalize(&temp.path().join("not-yet"));
        assert_eq!(
            resolved,
            fs::canonicalize(temp.path()).unwrap().join("not-yet")
        );
    }
}
