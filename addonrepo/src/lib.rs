//! AddonRepo - packaging pipeline for third-party add-on repositories
//!
//! Scans versioned add-on source directories, packages each into a
//! deterministic zip archive, and publishes a manifest plus a static,
//! browsable listing into a single output directory that can be served
//! verbatim by any static host.
//!
//! The pipeline flows one way:
//!
//! ```text
//! sources ──► builder ──► staging tree (archives + manifest)
//!                              │
//!                              ▼
//!                          listing ──► atomic commit ──► output dir
//! ```
//!
//! See [`builder::publish`] for the complete pipeline and [`verify::verify`]
//! for the consumer-side integrity check.

pub mod addon;
pub mod builder;
pub mod checksum;
pub mod config;
pub mod durable;
pub mod listing;
pub mod manifest;
pub mod naming;
pub mod verify;

pub use addon::{AddonDescriptor, AddonId, AddonVersion, VersionScheme};
pub use builder::{build, build_with, publish, BuildError, BuildResult};
pub use config::{BuildConfig, ListingConfig};
pub use listing::{render, RenderError};
pub use manifest::{ArchiveArtifact, ManifestEntry, RepositoryManifest};
pub use verify::{verify, Problem, VerifyReport};
