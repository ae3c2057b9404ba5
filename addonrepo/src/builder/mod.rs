//! Manifest builder.
//!
//! Turns a set of add-on source directories into a publishable output
//! tree: one deterministic zip archive per add-on version plus the
//! aggregate manifest. The build is a pipeline of stages that pass values
//! along:
//!
//! 1. discover candidate directories
//! 2. parse each `addon.ini`
//! 3. reject duplicate `(id, version)` pairs
//! 4. archive, digest and write each add-on (in parallel)
//! 5. refuse to change the content of an already-published version
//! 6. write the manifest once every archive is on disk
//! 7. atomically replace the output directory
//!
//! Any error aborts the build and leaves the previous output untouched.
//!
//! # Example
//!
//! ```no_run
//! use addonrepo::builder;
//! use addonrepo::config::{BuildConfig, ListingConfig};
//!
//! let config = BuildConfig::new(vec!["addons".into()], "dist");
//! let manifest = builder::publish(&config, &ListingConfig::default())?;
//! println!("{} archives", manifest.artifact_count());
//! # Ok::<(), addonrepo::builder::BuildError>(())
//! ```

pub mod archive;
mod discovery;
mod error;
pub mod staging;

pub use discovery::{check_duplicates, discover_candidates, parse_candidates};
pub use error::{BuildError, BuildResult};

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use glob::Pattern;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::addon::AddonDescriptor;
use crate::checksum::sha256_hex;
use crate::config::{BuildConfig, ListingConfig};
use crate::durable::write_synced;
use crate::listing;
use crate::manifest::{ArchiveArtifact, ManifestEntry, RepositoryManifest};
use crate::naming::{self, MANIFEST_FILENAME};
use staging::Staging;

/// An add-on version that has been archived and written to staging.
#[derive(Debug, Clone)]
struct PackagedAddon {
    descriptor: AddonDescriptor,
    artifact: ArchiveArtifact,
    newest_modified: Option<SystemTime>,
}

/// Build the repository without rendering a listing.
pub fn build(config: &BuildConfig) -> BuildResult<RepositoryManifest> {
    build_with(config, |_, _| Ok(()))
}

/// Build the repository and render the listing into the same commit.
pub fn publish(
    config: &BuildConfig,
    listing_config: &ListingConfig,
) -> BuildResult<RepositoryManifest> {
    build_with(config, |manifest, staged| {
        listing::render(manifest, staged, listing_config)?;
        Ok(())
    })
}

/// Build the repository, running `finish` on the staged tree before it is
/// committed.
///
/// `finish` receives the finished manifest and the staging directory. If
/// it fails, nothing is committed.
pub fn build_with<F>(config: &BuildConfig, finish: F) -> BuildResult<RepositoryManifest>
where
    F: FnOnce(&RepositoryManifest, &Path) -> BuildResult<()>,
{
    config.validate()?;
    let excludes = config.exclude_patterns()?;

    let candidates = discover_candidates(&config.sources)?;
    let descriptors = parse_candidates(&candidates, config.version_scheme)?;
    check_duplicates(&descriptors)?;

    info!(
        count = descriptors.len(),
        scheme = %config.version_scheme,
        "Discovered add-ons"
    );

    let previous = load_previous(&config.output_dir);
    let staging = Staging::create(&config.output_dir)?;

    let packaged = package_all(&descriptors, &excludes, staging.path(), config.jobs)?;

    let generated_at = config
        .generated_at
        .unwrap_or_else(|| newest_timestamp(&packaged));
    let manifest = assemble(generated_at, config, packaged)?;

    if let Some(previous) = &previous {
        check_digest_drift(previous, &manifest, config.allow_digest_change)?;
    }

    manifest.write(staging.path())?;
    finish(&manifest, staging.path())?;
    staging.commit()?;

    info!(
        addons = manifest.addon_count(),
        archives = manifest.artifact_count(),
        bytes = manifest.total_size(),
        output = %config.output_dir.display(),
        "Build complete"
    );

    Ok(manifest)
}

/// Archive every add-on on a bounded pool.
///
/// Results come back in descriptor order, so the reported error is always
/// the first failing add-on in that order regardless of scheduling.
fn package_all(
    descriptors: &[AddonDescriptor],
    excludes: &[Pattern],
    staging: &Path,
    jobs: usize,
) -> BuildResult<Vec<PackagedAddon>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("addonrepo-pack-{}", i))
        .build()
        .map_err(|e| BuildError::InvalidConfig(format!("failed to start workers: {}", e)))?;

    let results: Vec<BuildResult<PackagedAddon>> = pool.install(|| {
        descriptors
            .par_iter()
            .map(|descriptor| package(descriptor, excludes, staging))
            .collect()
    });

    results.into_iter().collect()
}

/// Archive, digest and write one add-on.
fn package(
    descriptor: &AddonDescriptor,
    excludes: &[Pattern],
    staging: &Path,
) -> BuildResult<PackagedAddon> {
    let packed = archive::pack(&descriptor.id, &descriptor.source_path, excludes)?;
    let sha256 = sha256_hex(&packed.bytes);

    let relative = naming::artifact_path(&descriptor.id, &descriptor.version);
    let destination = naming::resolve_artifact_path(staging, &relative);
    write_synced(&destination, &packed.bytes).map_err(|e| BuildError::output(&destination, e))?;

    debug!(
        id = %descriptor.id,
        version = %descriptor.version,
        name = descriptor.display_name(),
        files = packed.file_count,
        size = packed.bytes.len(),
        sha256 = %sha256,
        "Archived add-on"
    );

    Ok(PackagedAddon {
        descriptor: descriptor.clone(),
        artifact: ArchiveArtifact {
            file_name: naming::archive_filename(&descriptor.id, &descriptor.version),
            path: relative,
            sha256,
            size: packed.bytes.len() as u64,
        },
        newest_modified: packed.newest_modified,
    })
}

/// Collect packaged add-ons into a manifest.
fn assemble(
    generated_at: DateTime<Utc>,
    config: &BuildConfig,
    packaged: Vec<PackagedAddon>,
) -> BuildResult<RepositoryManifest> {
    let mut manifest = RepositoryManifest::new(generated_at, config.version_scheme);

    for addon in packaged {
        let descriptor = addon.descriptor;
        let entry = ManifestEntry {
            version: descriptor.version.clone(),
            metadata: descriptor.metadata,
            requires: descriptor.requires,
            artifact: addon.artifact,
        };
        if !manifest.insert(descriptor.id.clone(), entry) {
            // check_duplicates ran first; reaching this is a bug.
            return Err(BuildError::DuplicateVersion {
                id: descriptor.id.to_string(),
                version: descriptor.version.to_string(),
                first: descriptor.source_path.clone(),
                second: descriptor.source_path,
            });
        }
    }

    Ok(manifest)
}

/// Newest packaged file time, truncated to whole seconds.
///
/// Falls back to the Unix epoch when nothing was packaged.
fn newest_timestamp(packaged: &[PackagedAddon]) -> DateTime<Utc> {
    packaged
        .iter()
        .filter_map(|p| p.newest_modified)
        .max()
        .map(DateTime::<Utc>::from)
        .and_then(|t| DateTime::<Utc>::from_timestamp(t.timestamp(), 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Load the manifest currently published in the output directory, if any.
fn load_previous(output_dir: &Path) -> Option<RepositoryManifest> {
    if !output_dir.join(MANIFEST_FILENAME).is_file() {
        return None;
    }

    match RepositoryManifest::load(output_dir) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            debug!(error = %e, "Ignoring unreadable previous manifest");
            None
        }
    }
}

/// Compare rebuilt versions against the ones already published.
///
/// A published archive is never replaced with different content unless
/// `allow` is set, in which case each change is logged and counted.
fn check_digest_drift(
    previous: &RepositoryManifest,
    current: &RepositoryManifest,
    allow: bool,
) -> BuildResult<usize> {
    let mut drifted = 0;

    for (id, entry) in current.artifacts() {
        let Some(versions) = previous.versions(id) else {
            continue;
        };
        let Some(old) = versions
            .iter()
            .find(|e| e.version.as_str() == entry.version.as_str())
        else {
            continue;
        };

        if old.artifact.sha256 == entry.artifact.sha256 {
            continue;
        }
        if !allow {
            return Err(BuildError::DigestChanged {
                id: id.to_string(),
                version: entry.version.to_string(),
                previous: old.artifact.sha256.clone(),
                current: entry.artifact.sha256.clone(),
            });
        }

        warn!(
            id = %id,
            version = %entry.version,
            previous = %old.artifact.sha256,
            current = %entry.artifact.sha256,
            "Replacing published version with different content"
        );
        drifted += 1;
    }

    Ok(drifted)
}
