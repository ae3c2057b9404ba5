//! `addonrepo render`: regenerate the listing of an existing output directory.

use std::path::PathBuf;

use addonrepo::config::ConfigFile;
use addonrepo::listing;
use addonrepo::manifest::RepositoryManifest;
use clap::Args;
use console::style;

use super::common::resolve_listing;
use crate::error::CliError;

/// Arguments for the render command.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Output directory containing manifest.json
    pub dir: PathBuf,

    /// Listing page title
    #[arg(long)]
    pub title: Option<String>,
}

/// Run the render command.
pub fn run(args: RenderArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manifest = RepositoryManifest::load(&args.dir)?;
    let listing_config = resolve_listing(args.title, config);

    listing::render(&manifest, &args.dir, &listing_config)?;

    println!(
        "{} listing for {} add-on(s) in {}",
        style("Rendered").green().bold(),
        manifest.addon_count(),
        args.dir.display()
    );
    Ok(())
}
