//! # Logging Utilities
//!
//! Logging infrastructure for memsnap using `tracing`.
//!
//! Log output goes to stderr so it never mixes with the reports a command
//! prints on stdout. Optionally, the same events are written to a file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memsnap_utils::init_logging;
//!
//! // Reads RUST_LOG, MEMSNAP_LOG_FORMAT and MEMSNAP_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Snapshot loaded");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Level or filter directives (e.g. `debug`, `memsnap_core=trace`)
//! - `MEMSNAP_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `MEMSNAP_LOG_FILE`: Optional log file path. If it names an existing
//!   directory, a dated file (`YYYY-MM-DD-memsnap.log`) is created inside it.
//!
//! An explicit level (e.g. from a `--log-level` flag) takes precedence over
//! `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "MEMSNAP_LOG_FORMAT";
const FILE_VAR: &str = "MEMSNAP_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    /// Default level
    Info,
    Debug,
    /// Most verbose
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Resolved logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    /// Explicit level; `None` defers to `RUST_LOG`, then `info`.
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    /// Optional log file (or directory for a dated file).
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read format and file from the environment
    ///
    /// An unparsable `MEMSNAP_LOG_FORMAT` falls back to [`LogFormat::Pretty`].
    pub fn from_env() -> Self
    {
        let format = env::var(FORMAT_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();
        let file = env::var_os(FILE_VAR).filter(|value| !value.is_empty()).map(PathBuf::from);

        Self {
            level: None,
            format,
            file,
        }
    }

    /// Override the level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    /// Build the event filter: explicit level, then `RUST_LOG`, then `info`.
    fn filter(&self) -> EnvFilter
    {
        match self.level {
            Some(level) => EnvFilter::new(Level::from(level).to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
        }
    }

    /// Install the global subscriber.
    ///
    /// ## Errors
    ///
    /// Returns an error if a global subscriber is already installed or the log
    /// file directory cannot be created.
    pub fn init(self) -> Result<LoggingGuard, LoggingError>
    {
        let mut layers: Vec<BoxedLayer> = vec![console_layer(self.format, self.filter())];

        let mut guard = None;
        if let Some(path) = &self.file {
            let path = log_file_path(path);
            let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
            std::fs::create_dir_all(directory)?;

            let file_name = path.file_name().map_or_else(|| default_file_name().into(), ToOwned::to_owned);
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, worker) = tracing_appender::non_blocking(appender);
            layers.push(file_layer(self.format, self.filter(), writer));
            guard = Some(worker);
        }

        Registry::default()
            .with(layers)
            .try_init()
            .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

        Ok(LoggingGuard { _file: guard })
    }
}

/// Keeps the file writer alive; dropping it flushes pending log lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// ## Errors
///
/// See [`LogConfig::init`].
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    LogConfig::from_env().init()
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, filter: EnvFilter, writer: tracing_appender::non_blocking::NonBlocking) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}

/// Dated log file name, e.g. `2025-01-31-memsnap.log`.
fn default_file_name() -> String
{
    format!("{}-memsnap.log", Utc::now().format("%Y-%m-%d"))
}

/// A directory gets a dated file inside it; anything else is used as-is.
fn log_file_path(path: &Path) -> PathBuf
{
    if path.is_dir() {
        path.join(default_file_name())
    } else {
        path.to_path_buf()
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
