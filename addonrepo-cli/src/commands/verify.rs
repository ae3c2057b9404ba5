//! `addonrepo verify`: check an output directory against its manifest.

use std::path::PathBuf;

use addonrepo::verify::verify;
use clap::Args;
use console::style;

use crate::error::CliError;

/// Arguments for the verify command.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Output directory containing manifest.json
    pub dir: PathBuf,
}

/// Run the verify command. Fails when any problem is found.
pub fn run(args: VerifyArgs) -> Result<(), CliError> {
    let report = verify(&args.dir)?;

    if report.is_clean() {
        println!(
            "{} {} archive(s) in {}",
            style("OK").green().bold(),
            report.checked,
            args.dir.display()
        );
        return Ok(());
    }

    for problem in &report.problems {
        println!("{} {}", style("FAIL").red().bold(), problem);
    }
    Err(CliError::VerifyFailed(report.problems.len()))
}
