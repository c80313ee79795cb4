//! # Logging Utilities
//!
//! Logging setup for pwmctl using `tracing`.
//!
//! Diagnostics go to stderr so that stdout carries only the progress lines
//! printed by the CLI. Optionally a copy is written to a daily-rolling file.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: level filter (e.g. `debug`, `pwmctl_core=trace`)
//! - `PWMCTL_LOG_FORMAT`: `pretty` (default) or `json`
//! - `PWMCTL_LOG_FILE`: optional path of a log file
//!
//! ## Example
//!
//! ```rust,no_run
//! use pwmctl_utils::{init_logging_with_level, LogFormat, LogLevel};
//!
//! init_logging_with_level(LogLevel::Debug, LogFormat::Pretty).expect("Failed to initialize logging");
//! tracing::debug!("exporting channel");
//! ```

use std::env;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "PWMCTL_LOG_FORMAT";
const FILE_VAR: &str = "PWMCTL_LOG_FILE";

/// Keeps the file writer thread alive for the life of the process
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines
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
        match s.to_lowercase().as_str() {
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
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level, includes every sysfs write
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
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Resolved logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig
{
    /// Console and file format
    pub format: LogFormat,
    /// Filter directive, e.g. `info` or `pwmctl_core=trace`
    pub filter: String,
    /// Optional log file
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read settings from `RUST_LOG`, `PWMCTL_LOG_FORMAT` and `PWMCTL_LOG_FILE`
    ///
    /// An explicit `level` replaces whatever `RUST_LOG` says.
    ///
    /// ## Errors
    ///
    /// - `InvalidFormat`: `PWMCTL_LOG_FORMAT` is set to an unknown value
    pub fn from_env(level: Option<LogLevel>) -> Result<Self, LoggingError>
    {
        let format = match env::var(FORMAT_VAR) {
            Ok(value) => value.parse()?,
            Err(_) => LogFormat::default(),
        };
        let filter = match level {
            Some(level) => Level::from(level).to_string(),
            None => env::var("RUST_LOG").unwrap_or_else(|_| Level::INFO.to_string()),
        };
        let file = log_file_from_env();

        Ok(Self { format, filter, file })
    }
}

/// Initialize logging from the environment
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed or the environment
/// holds an invalid format.
pub fn init_logging() -> Result<(), LoggingError>
{
    init_with_config(&LogConfig::from_env(None)?)
}

/// Initialize logging with an explicit level and format
///
/// `PWMCTL_LOG_FILE` is still honoured.
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    init_with_config(&LogConfig {
        format,
        filter: Level::from(level).to_string(),
        file: log_file_from_env(),
    })
}

/// Initialize logging from a resolved [`LogConfig`]
///
/// ## Errors
///
/// - `InvalidFilter`: the filter directive does not parse
/// - `InitializationFailed`: a global subscriber is already set
pub fn init_with_config(config: &LogConfig) -> Result<(), LoggingError>
{
    let filter = || EnvFilter::try_new(&config.filter).map_err(|e| LoggingError::InvalidFilter(e.to_string()));

    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.format).with_filter(filter()?).boxed()];
    if let Some(path) = &config.file {
        layers.push(file_layer(path, config.format).with_filter(filter()?).boxed());
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}

fn log_file_from_env() -> Option<PathBuf>
{
    env::var_os(FILE_VAR).filter(|v| !v.is_empty()).map(PathBuf::from)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn console_layer(format: LogFormat) -> BoxedLayer
{
    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);
    match format {
        LogFormat::Pretty => layer.with_ansi(io::stderr().is_terminal()).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

fn file_layer(path: &Path, format: LogFormat) -> BoxedLayer
{
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or_default();
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
    // only the first installed subscriber keeps its guard; later ones fail try_init anyway
    let _ = FILE_GUARD.set(guard);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(false); // No ANSI in files
    match format {
        LogFormat::Pretty => layer.boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
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

    /// Filter directive did not parse
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}
