//! AddonRepo CLI - Command-line interface
//!
//! Builds an add-on repository from source directories, re-renders its
//! listing, and verifies a published output directory.

mod commands;
mod error;
mod logging;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use console::style;

use commands::build::BuildArgs;
use commands::render::RenderArgs;
use commands::verify::VerifyArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "addonrepo", version, about = "Build and publish add-on repositories")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Configuration file (default: ./addonrepo.ini, then the user config)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Package add-ons and publish the output directory
    Build(BuildArgs),

    /// Re-render the listing of an existing output directory
    Render(RenderArgs),

    /// Check an output directory against its manifest
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::common::load_config(cli.config.as_deref())?;

    let level = logging::level_for(cli.verbose, cli.quiet, config.logging.level.as_deref());
    let log_file = cli.log_file.clone().or_else(|| config.logging.file.clone());
    let _guard = logging::init(&level, log_file.as_deref())?;

    if let Some(path) = &config.path {
        tracing::debug!(path = %path.display(), "Loaded configuration");
    }

    match cli.command {
        Commands::Build(args) => commands::build::run(args, &config),
        Commands::Render(args) => commands::render::run(args, &config),
        Commands::Verify(args) => commands::verify::run(args),
    }
}

/// Print an error and its source chain to stderr.
fn report(error: &CliError) {
    eprintln!("{} {}", style("error:").red().bold(), error);

    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}
