//! Process-wide log sink.
//!
//! The engine logs through `tracing` everywhere. [`init_logging`] installs the
//! subscriber once per process: timestamped lines on the console plus an
//! optional plain-text file. Messages below the configured [`LogLevel`] are
//! dropped.
//!
//! Script code reaches the same sink through [`log_message`], which the
//! scripting bridges call for `log_debug`, `log_info`, `log_warning` and
//! `log_error`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Target used for messages forwarded from scripts.
pub const SCRIPT_TARGET: &str = "script";

/// Severity threshold, ordered `Debug < Info < Warn < Error < Disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    /// Drop everything.
    Disabled,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Disabled => LevelFilter::OFF,
        }
    }
}

/// Errors raised while installing the log sink.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log file could not be opened.
    #[error("failed to open log file {path}: {source}")]
    Io {
        /// Requested log file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A global subscriber is already installed in this process.
    #[error("logging is already initialized for this process")]
    AlreadyInstalled,
}

/// Install the console sink and, if `file` is given, a file sink.
///
/// The file is appended to, without ANSI colors. May be called once per
/// process; later calls return [`LogError::AlreadyInstalled`].
pub fn init_logging(level: LogLevel, file: Option<&Path>) -> Result<(), LogError> {
    let file_layer = match file {
        Some(path) => {
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LogError::Io {
                    path: path.to_owned(),
                    source,
                })?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(handle)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(LevelFilter::from(level))
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|_| LogError::AlreadyInstalled)?;

    tracing::info!(?level, file = ?file, "logging initialized");
    Ok(())
}

/// Forward a message from script code to the process sink.
///
/// `Disabled` drops the message.
pub fn log_message(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(target: SCRIPT_TARGET, "{message}"),
        LogLevel::Info => tracing::info!(target: SCRIPT_TARGET, "{message}"),
        LogLevel::Warn => tracing::warn!(target: SCRIPT_TARGET, "{message}"),
        LogLevel::Error => tracing::error!(target: SCRIPT_TARGET, "{message}"),
        LogLevel::Disabled => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Disabled);
    }

    #[test]
    fn disabled_maps_to_off() {
        assert_eq!(LevelFilter::from(LogLevel::Disabled), LevelFilter::OFF);
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
    }

    #[test]
    fn level_names_deserialize_lowercase() {
        let level: LogLevel = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(level, LogLevel::Error);
    }
}
