//! `sheetkit_log` v1:
//! `tracing` subscriber bootstrap shared by binaries and integration tests.
//!
//! Library crates only emit events; installing a subscriber is left to the
//! process entry point through [`init_logging`].

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default filter directive when `RUST_LOG` is unset.
pub const C_LOG_LEVEL_DEFAULT: &str = "info";
/// File name prefix used by the rolling file layer.
pub const C_LOG_FILE_PREFIX: &str = "sheetkit.log";

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumLogFormat {
    /// Human readable multi-line output.
    #[default]
    Pretty,
    /// Single-line compact output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Logging bootstrap options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLogOptions {
    /// Level or filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Console layer format.
    pub format: EnumLogFormat,
    /// Emit events to stderr.
    pub if_console: bool,
    /// Directory for a daily rolling JSON log file.
    pub dir_file: Option<PathBuf>,
}

impl Default for SpecLogOptions {
    fn default() -> Self {
        Self {
            level: C_LOG_LEVEL_DEFAULT.to_string(),
            format: EnumLogFormat::Pretty,
            if_console: true,
            dir_file: None,
        }
    }
}

/// Logging bootstrap failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogInitError {
    /// Filter directive could not be parsed.
    #[error("Invalid log filter {0:?}")]
    InvalidFilter(String),
    /// Log directory could not be created.
    #[error("Failed to create log directory {path}: {message}")]
    LogDir {
        /// Directory being created.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
    /// A global subscriber is already installed.
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Keeps the non-blocking file writer alive; drop it to flush.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Whether a file layer is attached.
    pub fn if_file_logging(&self) -> bool {
        self._file_guard.is_some()
    }
}

fn derive_env_filter(level: &str) -> Result<EnvFilter, LogInitError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|_| LogInitError::InvalidFilter(level.to_string()))
}

/// Install the global subscriber described by `options`.
///
/// `RUST_LOG` wins over `options.level`. Calling this twice returns
/// [`LogInitError::AlreadyInitialized`] and leaves the first subscriber in place.
pub fn init_logging(options: &SpecLogOptions) -> Result<LoggingGuard, LogInitError> {
    let env_filter = derive_env_filter(&options.level)?;

    let mut layers = Vec::new();

    if options.if_console {
        let layer_console = match options.format {
            EnumLogFormat::Pretty => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .pretty()
                .boxed(),
            EnumLogFormat::Compact => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .boxed(),
            EnumLogFormat::Json => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json()
                .boxed(),
        };
        layers.push(layer_console);
    }

    let file_guard = match &options.dir_file {
        None => None,
        Some(path_dir) => {
            std::fs::create_dir_all(path_dir).map_err(|e| LogInitError::LogDir {
                path: path_dir.clone(),
                message: e.to_string(),
            })?;
            let appender = RollingFileAppender::new(Rotation::DAILY, path_dir, C_LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
    };

    tracing_subscriber::registry()
        .with(layers.with_filter(env_filter))
        .try_init()
        .map_err(|_| LogInitError::AlreadyInitialized)?;

    tracing::debug!(
        format = ?options.format,
        if_file_logging = file_guard.is_some(),
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
