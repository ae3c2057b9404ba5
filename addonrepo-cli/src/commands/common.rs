//! Common types and utilities shared across CLI commands.

use std::env;
use std::path::{Path, PathBuf};

use addonrepo::addon::VersionScheme;
use addonrepo::config::{ConfigFile, ListingConfig};
use chrono::{DateTime, Utc};
use clap::ValueEnum;

use crate::error::CliError;

/// Output directory used when neither `--output` nor the config sets one.
pub const DEFAULT_OUTPUT: &str = "dist";

/// Version scheme selection for CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemeArg {
    /// Semantic versions (1.2.3, 2.0.0-beta.1)
    Semver,
    /// Calendar versions (YYYY.MM.DD[.N])
    Date,
}

impl From<SchemeArg> for VersionScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Semver => VersionScheme::Semver,
            SchemeArg::Date => VersionScheme::Date,
        }
    }
}

/// Load the configuration file.
///
/// An explicit `--config` path must exist. Otherwise `./addonrepo.ini`
/// and then the per-user file are tried, falling back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigFile, CliError> {
    match explicit {
        Some(path) => Ok(ConfigFile::load(path)?),
        None => {
            let cwd = env::current_dir().map_err(|e| {
                CliError::Config(format!("cannot determine working directory: {}", e))
            })?;
            Ok(ConfigFile::discover(&cwd)?)
        }
    }
}

/// Parse a build timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T12:00:00Z`) or whole seconds since the
/// Unix epoch, the form `SOURCE_DATE_EPOCH` uses.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();

    if let Ok(seconds) = raw.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or_else(|| format!("timestamp {} is out of range", seconds));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 or Unix seconds: {}", e))
}

/// Resolve source roots: arguments first, then the config file.
pub fn resolve_sources(cli: Vec<PathBuf>, config: &ConfigFile) -> Result<Vec<PathBuf>, CliError> {
    let sources = if cli.is_empty() {
        config.repository.sources.clone()
    } else {
        cli
    };

    if sources.is_empty() {
        return Err(CliError::Config(
            "no source directories; pass them as arguments or set 'sources' in [repository]"
                .to_string(),
        ));
    }
    Ok(sources)
}

/// Resolve the output directory: argument, config file, then `dist`.
pub fn resolve_output(cli: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    cli.or_else(|| config.repository.output.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

/// Resolve listing settings: argument, config file, then the default title.
pub fn resolve_listing(cli_title: Option<String>, config: &ConfigFile) -> ListingConfig {
    cli_title
        .or_else(|| config.repository.title.clone())
        .map(ListingConfig::new)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use addonrepo::config::DEFAULT_TITLE;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        assert_eq!(
            parse_timestamp("2024-05-01T12:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-05-01T14:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_epoch_seconds() {
        assert_eq!(
            parse_timestamp("1714564800").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_scheme_arg_converts() {
        assert_eq!(VersionScheme::from(SchemeArg::Semver), VersionScheme::Semver);
        assert_eq!(VersionScheme::from(SchemeArg::Date), VersionScheme::Date);
        assert_eq!(SchemeArg::from_str("date", false), Ok(SchemeArg::Date));
        assert!(SchemeArg::from_str("calver", false).is_err());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_sources_prefer_arguments() {
        let mut config = ConfigFile::default();
        config.repository.sources = vec![PathBuf::from("from-config")];

        let sources = resolve_sources(vec![PathBuf::from("from-cli")], &config).unwrap();
        assert_eq!(sources, vec![PathBuf::from("from-cli")]);

        let sources = resolve_sources(Vec::new(), &config).unwrap();
        assert_eq!(sources, vec![PathBuf::from("from-config")]);
    }

    #[test]
    fn test_sources_required() {
        let err = resolve_sources(Vec::new(), &ConfigFile::default()).unwrap_err();
        assert!(err.to_string().contains("no source directories"));
    }

    #[test]
    fn test_output_precedence() {
        let mut config = ConfigFile::default();
        assert_eq!(resolve_output(None, &config), PathBuf::from(DEFAULT_OUTPUT));

        config.repository.output = Some(PathBuf::from("/srv/repo"));
        assert_eq!(resolve_output(None, &config), PathBuf::from("/srv/repo"));
        assert_eq!(
            resolve_output(Some(PathBuf::from("out")), &config),
            PathBuf::from("out")
        );
    }

    #[test]
    fn test_listing_precedence() {
        let mut config = ConfigFile::default();
        assert_eq!(resolve_listing(None, &config).title, DEFAULT_TITLE);

        config.repository.title = Some("From config".to_string());
        assert_eq!(resolve_listing(None, &config).title, "From config");
        assert_eq!(
            resolve_listing(Some("From CLI".to_string()), &config).title,
            "From CLI"
        );
    }
}
