//! `listing.json`: a compact, browse-oriented view of the manifest.
//!
//! Unlike the manifest it lists versions newest first and carries only
//! what a catalogue page needs.

use serde::Serialize;

use crate::config::ListingConfig;
use crate::manifest::{format_timestamp, RepositoryManifest};

#[derive(Debug, Serialize)]
struct ListingIndex<'a> {
    title: &'a str,
    generated_at: String,
    addons: Vec<AddonSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct AddonSummary<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    latest: &'a str,
    versions: Vec<VersionSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct VersionSummary<'a> {
    version: &'a str,
    path: &'a str,
    size: u64,
    sha256: &'a str,
}

/// Serialize the listing index (pretty JSON, trailing newline).
pub fn render_listing_index(
    manifest: &RepositoryManifest,
    config: &ListingConfig,
) -> Result<String, serde_json::Error> {
    let addons = manifest
        .addons()
        .filter_map(|(id, versions)| {
            let latest = versions.last()?;
            Some(AddonSummary {
                id: id.as_str(),
                name: latest.name().unwrap_or(id.as_str()),
                summary: latest.summary(),
                latest: latest.version.as_str(),
                versions: versions
                    .iter()
                    .rev()
                    .map(|e| VersionSummary {
                        version: e.version.as_str(),
                        path: &e.artifact.path,
                        size: e.artifact.size,
                        sha256: &e.artifact.sha256,
                    })
                    .collect(),
            })
        })
        .collect();

    let index = ListingIndex {
        title: &config.title,
        generated_at: format_timestamp(manifest.generated_at()),
        addons,
    };

    let mut json = serde_json::to_string_pretty(&index)?;
    json.push('\n');
    Ok(json)
}
