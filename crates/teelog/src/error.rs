//! Error types for the logging system.

use std::path::PathBuf;

use thiserror::Error;

use crate::gate::Bucket;

/// Errors raised while loading or validating the logging configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration source is not valid TOML.
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required table is absent.
    #[error("missing config section: {0}")]
    MissingSection(String),

    /// A bucket is missing a required key.
    #[error("{bucket} {field} is missing")]
    MissingField {
        /// Bucket whose section is incomplete.
        bucket: Bucket,
        /// Name of the missing key.
        field: &'static str,
    },

    /// A bucket key holds a value of the wrong type.
    #[error("{bucket} {field} is not a valid {expected}: {value}")]
    InvalidField {
        /// Bucket whose section is invalid.
        bucket: Bucket,
        /// Name of the offending key.
        field: &'static str,
        /// What the key should hold.
        expected: &'static str,
        /// The rejected value, as written in the file.
        value: String,
    },
}

/// Errors that can occur in the logging system.
#[derive(Debug, Error)]
pub enum LogError {
    /// Configuration could not be trusted.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of a record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A single record is larger than the sink's rotation threshold.
    #[error("record length {len} exceeds maximum file size {max}")]
    RecordTooLarge {
        /// Encoded length of the record.
        len: u64,
        /// Rotation threshold of the sink in bytes.
        max: u64,
    },

    /// The process-wide logger was already installed.
    #[error("process-wide logger already initialized")]
    AlreadyInitialized,
}

/// Result type alias for log operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = LogError::RecordTooLarge { len: 20, max: 10 };
        assert_eq!(
            err.to_string(),
            "record length 20 exceeds maximum file size 10"
        );

        let err = LogError::AlreadyInitialized;
        assert_eq!(err.to_string(), "process-wide logger already initialized");
    }

    #[test]
    fn invalid_field_names_bucket_and_field() {
        let err = ConfigError::InvalidField {
            bucket: Bucket::Info,
            field: "MAXSIZE",
            expected: "integer",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "INFO MAXSIZE is not a valid integer: abc");
    }

    #[test]
    fn missing_field_names_bucket_and_field() {
        let err = ConfigError::MissingField {
            bucket: Bucket::Error,
            field: "COMPRESS",
        };
        assert_eq!(err.to_string(), "ERROR COMPRESS is missing");
    }

    #[test]
    fn config_error_wraps_into_log_error() {
        let err: LogError = ConfigError::MissingSection("TEELOG".to_string()).into();
        assert!(matches!(err, LogError::Config(_)));
        assert!(err.to_string().contains("missing config section: TEELOG"));
    }

    #[test]
    fn error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LogError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogError>();
        assert_send_sync::<ConfigError>();
    }
}
