//! `addonrepo build`: package sources and publish the output directory.

use std::path::PathBuf;

use addonrepo::addon::VersionScheme;
use addonrepo::builder;
use addonrepo::config::{default_jobs, BuildConfig, ConfigFile};
use addonrepo::listing::format_size;
use addonrepo::manifest::RepositoryManifest;
use chrono::{DateTime, Utc};
use clap::Args;
use console::style;

use super::common::{
    parse_timestamp, resolve_listing, resolve_output, resolve_sources, SchemeArg,
};
use crate::error::CliError;

/// Arguments for the build command.
#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Source roots; each directory beneath a root is one add-on
    pub sources: Vec<PathBuf>,

    /// Output directory, replaced atomically on success
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of add-ons archived in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Version scheme for add-on versions
    #[arg(long, value_enum)]
    pub version_scheme: Option<SchemeArg>,

    /// Build timestamp (RFC 3339 or Unix seconds)
    #[arg(long, env = "SOURCE_DATE_EPOCH", value_parser = parse_timestamp)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Glob pattern for names to leave out of archives (repeatable; replaces the defaults)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Listing page title
    #[arg(long)]
    pub title: Option<String>,

    /// Skip rendering the listing
    #[arg(long)]
    pub no_listing: bool,

    /// Replace already-published versions whose archive content changed
    #[arg(long)]
    pub allow_digest_change: bool,
}

/// Merge arguments over the config file into a build configuration.
pub fn build_config(args: &BuildArgs, config: &ConfigFile) -> Result<BuildConfig, CliError> {
    let sources = resolve_sources(args.sources.clone(), config)?;
    let output = resolve_output(args.output.clone(), config);

    let mut build = BuildConfig::new(sources, output)
        .with_version_scheme(
            args.version_scheme
                .map(VersionScheme::from)
                .or(config.build.version_scheme)
                .unwrap_or_default(),
        )
        .with_jobs(args.jobs.or(config.build.jobs).unwrap_or_else(default_jobs))
        .with_allow_digest_change(
            args.allow_digest_change || config.build.allow_digest_change.unwrap_or(false),
        );

    if !args.exclude.is_empty() {
        build = build.with_exclude(args.exclude.clone());
    } else if let Some(exclude) = &config.build.exclude {
        build = build.with_exclude(exclude.clone());
    }

    if let Some(timestamp) = args.timestamp {
        build = build.with_generated_at(timestamp);
    }

    Ok(build)
}

/// Run the build command.
pub fn run(args: BuildArgs, config: &ConfigFile) -> Result<(), CliError> {
    let build = build_config(&args, config)?;

    let manifest = if args.no_listing {
        builder::build(&build)?
    } else {
        let listing = resolve_listing(args.title.clone(), config);
        builder::publish(&build, &listing)?
    };

    print_summary(&manifest, &build);
    Ok(())
}

fn print_summary(manifest: &RepositoryManifest, build: &BuildConfig) {
    println!(
        "{} {} add-on(s), {} archive(s), {} into {}",
        style("Built").green().bold(),
        manifest.addon_count(),
        manifest.artifact_count(),
        format_size(manifest.total_size()),
        build.output_dir.display()
    );

    for (id, versions) in manifest.addons() {
        let listed: Vec<&str> = versions.iter().rev().map(|e| e.version.as_str()).collect();
        println!("  {} {}", style(id).cyan(), listed.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: BuildArgs,
    }

    fn parse(argv: &[&str]) -> BuildArgs {
        TestCli::parse_from(std::iter::once("build").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_arguments_override_config() {
        let mut config = ConfigFile::default();
        config.repository.sources = vec![PathBuf::from("cfg-src")];
        config.build.jobs = Some(8);
        config.build.version_scheme = Some(VersionScheme::Date);
        config.build.exclude = Some(vec!["*.bak".to_string()]);

        let args = parse(&["src", "-o", "out", "-j", "2", "--version-scheme", "semver"]);
        let build = build_config(&args, &config).unwrap();

        assert_eq!(build.sources, vec![PathBuf::from("src")]);
        assert_eq!(build.output_dir, PathBuf::from("out"));
        assert_eq!(build.jobs, 2);
        assert_eq!(build.version_scheme, VersionScheme::Semver);
        assert_eq!(build.exclude, vec!["*.bak".to_string()]);
    }

    #[test]
    fn test_config_fills_gaps() {
        let mut config = ConfigFile::default();
        config.repository.sources = vec![PathBuf::from("cfg-src")];
        config.repository.output = Some(PathBuf::from("cfg-out"));
        config.build.version_scheme = Some(VersionScheme::Date);

        let args = parse(&["--exclude", "*.tmp"]);
        let build = build_config(&args, &config).unwrap();

        assert_eq!(build.sources, vec![PathBuf::from("cfg-src")]);
        assert_eq!(build.output_dir, PathBuf::from("cfg-out"));
        assert_eq!(build.version_scheme, VersionScheme::Date);
        assert_eq!(build.exclude, vec!["*.tmp".to_string()]);
    }

    #[test]
    fn test_allow_digest_change_sources() {
        let args = parse(&["src"]);
        let mut config = ConfigFile::default();
        assert!(!build_config(&args, &config).unwrap().allow_digest_change);

        config.build.allow_digest_change = Some(true);
        assert!(build_config(&args, &config).unwrap().allow_digest_change);

        let args = parse(&["src", "--allow-digest-change"]);
        assert!(
            build_config(&args, &ConfigFile::default())
                .unwrap()
                .allow_digest_change
        );
    }

    #[test]
    fn test_unknown_scheme_rejected_by_parser() {
        let result = TestCli::try_parse_from(["build", "src", "--version-scheme", "calver"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_argument() {
        let args = parse(&["src", "--timestamp", "2024-05-01T12:00:00Z"]);
        let build = build_config(&args, &ConfigFile::default()).unwrap();
        assert_eq!(
            build.generated_at.map(|t| t.timestamp()),
            Some(1_714_564_800)
        );
    }
}
