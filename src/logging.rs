use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding the log filter, e.g. `TUNECAST_LOG=debug`.
pub const LOG_ENV: &str = "TUNECAST_LOG";

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to a file; used while the TUI owns the terminal.
    File(PathBuf),
    Stderr,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("logging has already been initialised")]
    AlreadyInitialised,
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install the log subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global tracing subscriber. Only the first call succeeds.
pub fn init(target: LogTarget) -> Result<(), InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| InitError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| InitError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            Registry::default()
                .with(filter())
                .with(fmt_layer)
                .try_init()?;
        }
        LogTarget::Stderr => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr);
            Registry::default()
                .with(filter())
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // One test touches the global subscriber, so both calls live here.
    #[test]
    fn test_second_init_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("tunecast.log");

        init(LogTarget::File(path.clone())).unwrap();
        tracing::info!("hello from the log test");
        assert!(path.exists());

        assert_matches!(init(LogTarget::Stderr), Err(InitError::AlreadyInitialised));
    }
}
