//! HTML pages for the static listing.
//!
//! Pages are plain HTML with no scripts or external assets so they can be
//! served by any static host and browsed from a media center's file
//! source dialog.

use std::fmt::Write;

use super::format_size;
use crate::addon::AddonId;
use crate::config::ListingConfig;
use crate::manifest::{format_timestamp, ManifestEntry, RepositoryManifest};
use crate::naming::MANIFEST_FILENAME;

/// Escape text for use in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page_start(out: &mut String, title: &str) {
    let title = escape(title);
    out.push_str("<!DOCTYPE html>\n");
    out.push_str("<html lang=\"en\">\n");
    out.push_str("<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", title);
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    let _ = writeln!(out, "<h1>{}</h1>", title);
}

fn page_end(out: &mut String) {
    out.push_str("</body>\n");
    out.push_str("</html>\n");
}

fn artifact_item(out: &mut String, href: &str, entry: &ManifestEntry) {
    let marker = if entry.version.is_prerelease() {
        " <em>pre-release</em>"
    } else {
        ""
    };
    let _ = writeln!(
        out,
        "<li><a href=\"{}\">{}</a>{} ({}, sha256 <code>{}</code>)</li>",
        escape(href),
        escape(&entry.artifact.file_name),
        marker,
        format_size(entry.artifact.size),
        escape(&entry.artifact.sha256),
    );
}

/// Render the root `index.html`.
///
/// One section per add-on in id order; versions newest first. Name and
/// summary come from the newest version.
pub fn render_index_page(manifest: &RepositoryManifest, config: &ListingConfig) -> String {
    let mut out = String::new();
    page_start(&mut out, &config.title);

    let _ = writeln!(
        out,
        "<p>Generated {}. Machine-readable index: <a href=\"{}\">{}</a></p>",
        format_timestamp(manifest.generated_at()),
        MANIFEST_FILENAME,
        MANIFEST_FILENAME,
    );

    if manifest.is_empty() {
        out.push_str("<p>No add-ons.</p>\n");
    }

    for (id, versions) in manifest.addons() {
        let Some(latest) = versions.last() else {
            continue;
        };
        let id_text = escape(id.as_str());
        let name = latest.name().unwrap_or(id.as_str());

        let _ = writeln!(out, "<section id=\"{}\">", id_text);
        let _ = writeln!(out, "<h2><a href=\"{}/\">{}</a></h2>", id_text, escape(name));
        if let Some(summary) = latest.summary() {
            let _ = writeln!(out, "<p>{}</p>", escape(summary));
        }
        let _ = writeln!(
            out,
            "<p><code>{}</code> latest {}</p>",
            id_text,
            escape(latest.version.as_str())
        );
        out.push_str("<ul>\n");
        for entry in versions.iter().rev() {
            artifact_item(&mut out, &entry.artifact.path, entry);
        }
        out.push_str("</ul>\n");
        out.push_str("</section>\n");
    }

    page_end(&mut out);
    out
}

/// Render the directory page `{id}/index.html`.
///
/// Lists the parent link followed by the add-on's archives, newest first.
/// Links are relative to the add-on directory.
pub fn render_addon_page(id: &AddonId, versions: &[ManifestEntry]) -> String {
    let mut out = String::new();
    page_start(&mut out, id.as_str());

    out.push_str("<ul>\n");
    out.push_str("<li><a href=\"..\">..</a></li>\n");
    for entry in versions.iter().rev() {
        // Links resolve from inside `{id}/`, so only the last path segment.
        let href = entry
            .artifact
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&entry.artifact.path);
        artifact_item(&mut out, href, entry);
    }
    out.push_str("</ul>\n");

    page_end(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::VersionScheme;
    use crate::manifest::ArchiveArtifact;
    use crate::naming;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn add(manifest: &mut RepositoryManifest, id: &str, version: &str, name: &str) {
        let id = AddonId::parse(id).unwrap();
        let version = VersionScheme::Semver.parse(version).unwrap();
        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), name.to_string());
        let artifact = ArchiveArtifact {
            file_name: naming::archive_filename(&id, &version),
            path: naming::artifact_path(&id, &version),
            sha256: "a".repeat(64),
            size: 2048,
        };
        manifest.insert(
            id,
            ManifestEntry {
                version,
                metadata,
                requires: BTreeMap::new(),
                artifact,
            },
        );
    }

    fn manifest() -> RepositoryManifest {
        let mut manifest = RepositoryManifest::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            VersionScheme::Semver,
        );
        add(&mut manifest, "zeta", "1.0.0", "Zeta");
        add(&mut manifest, "alpha", "1.0.0", "Alpha old");
        add(&mut manifest, "alpha", "1.2.0", "Alpha <new>");
        manifest
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<a href=\"x\">Tom & Jerry's</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_index_page_order() {
        let html = render_index_page(&manifest(), &ListingConfig::default());

        let alpha = html.find("<section id=\"alpha\">").unwrap();
        let zeta = html.find("<section id=\"zeta\">").unwrap();
        assert!(alpha < zeta);

        let newer = html.find("alpha-1.2.0.zip").unwrap();
        let older = html.find("alpha-1.0.0.zip").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn test_index_page_uses_latest_name_escaped() {
        let html = render_index_page(&manifest(), &ListingConfig::new("My <Repo>"));
        assert!(html.contains("Alpha &lt;new&gt;"));
        assert!(!html.contains("Alpha old"));
        assert!(html.contains("<title>My &lt;Repo&gt;</title>"));
        assert!(html.contains("href=\"manifest.json\""));
        assert!(html.contains("2024-05-01T12:00:00Z"));
        assert!(html.contains("2.00 KB"));
    }

    #[test]
    fn test_empty_index_page() {
        let empty = RepositoryManifest::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            VersionScheme::Semver,
        );
        let html = render_index_page(&empty, &ListingConfig::default());
        assert!(html.contains("No add-ons."));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_addon_page() {
        let manifest = manifest();
        let id = AddonId::parse("alpha").unwrap();
        let html = render_addon_page(&id, manifest.versions(&id).unwrap());

        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">\n"));
        assert!(html.contains("<h1>alpha</h1>"));
        assert!(html.contains("<li><a href=\"..\">..</a></li>"));
        assert!(html.contains("href=\"alpha-1.2.0.zip\""));
        assert!(html.find("alpha-1.2.0.zip").unwrap() < html.find("alpha-1.0.0.zip").unwrap());
    }

    #[test]
    fn test_addon_page_links_follow_artifact_path() {
        let manifest = manifest();
        let id = AddonId::parse("alpha").unwrap();
        let mut versions = manifest.versions(&id).unwrap().to_vec();
        versions[1].artifact.file_name = "renamed.zip".to_string();

        let html = render_addon_page(&id, &versions);
        assert!(html.contains("href=\"alpha-1.2.0.zip\">renamed.zip</a>"));
    }

    #[test]
    fn test_prerelease_marked() {
        let mut manifest = manifest();
        add(&mut manifest, "alpha", "2.0.0-beta.1", "Alpha beta");

        let html = render_index_page(&manifest, &ListingConfig::default());
        assert!(html.contains("alpha-2.0.0-beta.1.zip</a> <em>pre-release</em>"));
        assert!(html.contains("alpha-1.2.0.zip</a> ("));
    }
}
