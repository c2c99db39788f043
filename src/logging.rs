//! File logging for the library's `tracing` events.
//!
//! The rendered stream owns stdout, so events go to a file. The library itself never installs a
//! subscriber.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Installs a global fmt subscriber appending to `path`, filtered by `EnvFilter` directives.
pub fn init_file_logging(path: impl AsRef<Path>, filter: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(filter)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::{init_file_logging, LoggingError};

    #[test]
    fn bad_filter_is_rejected_before_touching_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("never.log");
        let result = init_file_logging(&path, "md_tape=notalevel");
        assert!(matches!(result, Err(LoggingError::Filter(_))));
        assert!(!path.exists());
    }

    #[test]
    fn events_land_in_the_log_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("md_tape.log");
        init_file_logging(&path, "md_tape=debug").expect("install subscriber");

        tracing::debug!(target: "md_tape::logging", marker = 42, "file logging works");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert!(contents.contains("file logging works"), "log was: {contents}");
        assert!(contents.contains("marker=42"));
        assert!(matches!(
            init_file_logging(&path, "md_tape=debug"),
            Err(LoggingError::AlreadyInstalled)
        ));
    }
}
