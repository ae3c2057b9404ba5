//! Logging setup.
//!
//! Logs go to stderr so stdout stays reserved for command output. An
//! optional log file receives the same events without ANSI colors.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::CliError;

/// Keeps the file writer flushing until dropped.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Pick the default filter from flags and the configured level.
///
/// `-q` wins over everything; `-v` and `-vv` win over the config file.
pub fn level_for(verbose: u8, quiet: bool, configured: Option<&str>) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.unwrap_or("warn").to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, overrides `level`.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<LogGuard, CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::Logging(format!("invalid log level '{}': {}", level, e)))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    Ok(LogGuard { _file: guard })
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), CliError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| CliError::Logging(format!("invalid log file path {}", path.display())))?;

    std::fs::create_dir_all(directory).map_err(|e| {
        CliError::Logging(format!("cannot create {}: {}", directory.display(), e))
    })?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_defaults_to_warn() {
        assert_eq!(level_for(0, false, None), "warn");
    }

    #[test]
    fn test_level_from_config() {
        assert_eq!(level_for(0, false, Some("debug")), "debug");
    }

    #[test]
    fn test_verbose_overrides_config() {
        assert_eq!(level_for(1, false, Some("error")), "info");
        assert_eq!(level_for(2, false, None), "debug");
        assert_eq!(level_for(5, false, None), "trace");
    }

    #[test]
    fn test_quiet_wins() {
        assert_eq!(level_for(2, true, Some("debug")), "error");
    }
}
