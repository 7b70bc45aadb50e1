//! Logging configuration.
//!
//! The configuration lives under a top-level `[TEELOG]` table with one
//! sub-table per bucket:
//!
//! ```toml
//! [TEELOG]
//! MODE = "independent"
//!
//! [TEELOG.INFO]
//! FILE_PATH_NAME = "logs/info.log"
//! MAXSIZE = 10          # megabytes
//! MAXBACKUP_COUNT = 5
//! MAXAGE = 30           # days
//! COMPRESS = false
//!
//! [TEELOG.ERROR]
//! FILE_PATH_NAME = "logs/error.log"
//! MAXSIZE = "10"
//! MAXBACKUP_COUNT = 5
//! MAXAGE = 30
//! COMPRESS = "true"
//! ```
//!
//! Numeric and boolean keys may also be written as strings, and `COMPRESS`
//! accepts `0` and `1`. Every key except `MODE` and `FILE_PATH_NAME` is
//! required, and any value that does not parse is rejected with an error
//! naming the bucket and key.

use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::error::ConfigError;
use crate::gate::{Bucket, Mode};
use crate::sink::SinkSpec;

/// Name of the top-level configuration table.
pub const SECTION: &str = "TEELOG";

const MODE_KEY: &str = "MODE";
const FILE_PATH_KEY: &str = "FILE_PATH_NAME";
const MAX_SIZE_KEY: &str = "MAXSIZE";
const MAX_BACKUPS_KEY: &str = "MAXBACKUP_COUNT";
const MAX_AGE_KEY: &str = "MAXAGE";
const COMPRESS_KEY: &str = "COMPRESS";

/// Validated logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Routing topology.
    pub mode: Mode,
    /// Settings of the INFO bucket.
    pub info: SinkSpec,
    /// Settings of the ERROR bucket.
    pub error: SinkSpec,
}

impl LoggingConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or any
    /// bucket setting is missing or malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or any bucket setting is
    /// missing or malformed.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let root: Table = toml::from_str(content)?;
        let section = root
            .get(SECTION)
            .and_then(Value::as_table)
            .ok_or_else(|| ConfigError::MissingSection(SECTION.to_string()))?;

        let mode = Mode::parse(section.get(MODE_KEY).and_then(Value::as_str));
        let info = read_sink(section, Bucket::Info)?;
        let error = read_sink(section, Bucket::Error)?;

        Ok(Self { mode, info, error })
    }

    /// Returns the settings of `bucket`.
    #[must_use]
    pub const fn sink(&self, bucket: Bucket) -> &SinkSpec {
        match bucket {
            Bucket::Info => &self.info,
            Bucket::Error => &self.error,
        }
    }
}

/// Path used when a bucket does not name its file.
#[must_use]
pub fn default_file_path(bucket: Bucket) -> PathBuf {
    std::env::temp_dir().join(format!("teelog-{}.log", bucket.as_str().to_ascii_lowercase()))
}

fn read_sink(section: &Table, bucket: Bucket) -> Result<SinkSpec, ConfigError> {
    let table = section
        .get(bucket.as_str())
        .and_then(Value::as_table)
        .ok_or_else(|| ConfigError::MissingSection(format!("{SECTION}.{bucket}")))?;

    let file_path = match table.get(FILE_PATH_KEY) {
        None => default_file_path(bucket),
        Some(Value::String(s)) if s.trim().is_empty() => default_file_path(bucket),
        Some(Value::String(s)) => PathBuf::from(s),
        Some(other) => return Err(invalid(bucket, FILE_PATH_KEY, "string", other)),
    };

    Ok(SinkSpec::new(file_path)
        .with_max_size_mb(read_u64(table, bucket, MAX_SIZE_KEY)?)
        .with_max_backups(read_usize(table, bucket, MAX_BACKUPS_KEY)?)
        .with_max_age_days(read_u64(table, bucket, MAX_AGE_KEY)?)
        .with_compress(read_bool(table, bucket, COMPRESS_KEY)?))
}

fn require<'a>(
    table: &'a Table,
    bucket: Bucket,
    field: &'static str,
) -> Result<&'a Value, ConfigError> {
    table
        .get(field)
        .ok_or(ConfigError::MissingField { bucket, field })
}

fn read_u64(table: &Table, bucket: Bucket, field: &'static str) -> Result<u64, ConfigError> {
    let value = require(table, bucket, field)?;
    let parsed = match value {
        Value::Integer(n) => u64::try_from(*n).ok(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(bucket, field, "non-negative integer", value))
}

fn read_usize(table: &Table, bucket: Bucket, field: &'static str) -> Result<usize, ConfigError> {
    let value = require(table, bucket, field)?;
    read_u64(table, bucket, field).and_then(|n| {
        usize::try_from(n).map_err(|_| invalid(bucket, field, "non-negative integer", value))
    })
}

fn read_bool(table: &Table, bucket: Bucket, field: &'static str) -> Result<bool, ConfigError> {
    let value = require(table, bucket, field)?;
    let parsed = match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(0) => Some(false),
        Value::Integer(1) => Some(true),
        Value::String(s) => parse_bool(s),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(bucket, field, "boolean", value))
}

/// Parses the boolean spellings accepted in configuration strings.
#[must_use]
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn invalid(bucket: Bucket, field: &'static str, expected: &'static str, value: &Value) -> ConfigError {
    let value = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ConfigError::InvalidField {
        bucket,
        field,
        expected,
        value,
    }
}
