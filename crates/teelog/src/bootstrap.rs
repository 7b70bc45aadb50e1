//! Construction of loggers from configuration.
//!
//! [`build`] turns a [`LoggingConfig`] into an independent [`Logger`]; tests
//! and embedders can build as many as they like. [`init`] builds one from a
//! file and installs it as the process-wide logger, once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::config::LoggingConfig;
use crate::encoder::{Encoder, JsonEncoder};
use crate::error::{LogError, Result};
use crate::facade::Logger;
use crate::gate::{Bucket, LevelGate};
use crate::router::{RouteEntry, Router};
use crate::sink::FileSink;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "TEELOG_CONFIG";

/// Configuration file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "teelog.toml";

/// Exit status used when configuration cannot be trusted.
pub const CONFIG_EXIT_CODE: u8 = 2;

static GLOBAL: OnceCell<Logger> = OnceCell::new();

/// Builds a logger with one file sink per bucket, INFO first.
///
/// Sinks open lazily and stay open for the logger's lifetime.
#[must_use]
pub fn build(config: &LoggingConfig) -> Logger {
    let encoder: Arc<dyn Encoder> = Arc::new(JsonEncoder::new());
    let entries = Bucket::ALL
        .into_iter()
        .map(|bucket| {
            RouteEntry::new(
                LevelGate::new(bucket, config.mode),
                Arc::clone(&encoder),
                Arc::new(FileSink::new(config.sink(bucket).clone())),
            )
        })
        .collect();

    Logger::new(Router::new(entries), config.mode)
}

/// Loads `path` and builds a logger from it.
///
/// # Errors
///
/// Returns [`LogError::Config`] if the file is missing or malformed.
pub fn load(path: impl AsRef<Path>) -> Result<Logger> {
    let config = LoggingConfig::from_file(path.as_ref())?;
    let logger = build(&config);
    info!(
        config = %path.as_ref().display(),
        mode = %config.mode,
        info_file = %config.info.file_path.display(),
        error_file = %config.error.file_path.display(),
        "logger configured"
    );
    Ok(logger)
}

/// Loads `path` and installs the result as the process-wide logger.
///
/// # Errors
///
/// Returns [`LogError::AlreadyInitialized`] if a logger is already installed,
/// or [`LogError::Config`] if the file is missing or malformed.
pub fn init(path: impl AsRef<Path>) -> Result<&'static Logger> {
    if GLOBAL.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }
    let logger = load(path)?;
    GLOBAL.set(logger).map_err(|_| LogError::AlreadyInitialized)?;
    GLOBAL.get().ok_or(LogError::AlreadyInitialized)
}

/// Like [`init`], but reports any failure on stderr and exits with
/// [`CONFIG_EXIT_CODE`].
pub fn init_or_exit(path: impl AsRef<Path>) -> &'static Logger {
    match init(path) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("teelog: {e}");
            std::process::exit(i32::from(CONFIG_EXIT_CODE))
        }
    }
}

/// Returns the process-wide logger, if installed.
#[must_use]
pub fn global() -> Option<&'static Logger> {
    GLOBAL.get()
}

/// Returns the configuration path from [`CONFIG_ENV`], or [`DEFAULT_CONFIG_FILE`].
#[must_use]
pub fn config_path_from_env() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}
