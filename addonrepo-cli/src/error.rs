//! CLI error type.

use std::error::Error;
use std::fmt;

use addonrepo::builder::BuildError;
use addonrepo::config::ConfigError;
use addonrepo::listing::RenderError;

/// Errors reported by CLI commands.
///
/// Every variant is printed as a single `error:` line followed by its
/// source chain, and exits with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Missing or conflicting settings after merging arguments and config.
    Config(String),

    /// The configuration file could not be loaded.
    ConfigFile(ConfigError),

    /// The build failed.
    Build(BuildError),

    /// Rendering the listing failed.
    Render(RenderError),

    /// Verification found problems.
    VerifyFailed(usize),

    /// Logging could not be set up.
    Logging(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Build(e) => write!(f, "{}", e),
            CliError::Render(e) => write!(f, "{}", e),
            CliError::VerifyFailed(count) => {
                write!(f, "verification failed with {} problem(s)", count)
            }
            CliError::Logging(msg) => write!(f, "failed to set up logging: {}", msg),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        // Display already includes the wrapped error's message, so skip it
        // and continue from its own source.
        match self {
            CliError::ConfigFile(e) => e.source(),
            CliError::Build(e) => e.source(),
            CliError::Render(e) => e.source(),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<BuildError> for CliError {
    fn from(e: BuildError) -> Self {
        CliError::Build(e)
    }
}

impl From<RenderError> for CliError {
    fn from(e: RenderError) -> Self {
        CliError::Render(e)
    }
}
