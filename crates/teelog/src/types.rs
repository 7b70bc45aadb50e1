//! Core types for the routed logging system.
//!
//! This module provides:
//! - [`Severity`]: Ordered importance levels for log events
//! - [`LogEvent`]: A single event on its way to the sinks
//! - [`Field`] and [`KeyValues`]: Structured fields attached to an event
//! - [`Caller`]: Call-site location of an event

use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Value substituted for the missing value of a trailing key.
pub const MISSING_VALUE: &str = "!MISSING";

/// Log severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Debugging information. No sink accepts it.
    Debug = 0,
    /// General information
    Info = 1,
    /// Warning conditions
    Warn = 2,
    /// Error conditions
    Error = 3,
    /// Unrecoverable conditions; the caller is expected to terminate
    Fatal = 4,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Self; 5] = [Self::Debug, Self::Info, Self::Warn, Self::Error, Self::Fatal];

    /// Returns true if this severity is at least as severe as the given one.
    #[must_use]
    pub fn is_at_least(&self, severity: Self) -> bool {
        *self >= severity
    }

    /// Returns the capitalized name written into records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Source location of the code that emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Source file as reported by the compiler.
    pub file: &'static str,
    /// Line within `file`.
    pub line: u32,
}

impl Caller {
    /// Captures the location of the caller of the enclosing `#[track_caller]` function.
    #[must_use]
    #[track_caller]
    pub fn here() -> Self {
        Location::caller().into()
    }
}

impl From<&'static Location<'static>> for Caller {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for Caller {
    /// Writes `dir/file.rs:line`, keeping only the last two path segments.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.replace('\\', "/");
        let short = match file.rfind('/') {
            Some(last) => match file[..last].rfind('/') {
                Some(prev) => &file[prev + 1..],
                None => file.as_str(),
            },
            None => file.as_str(),
        };
        write!(f, "{short}:{}", self.line)
    }
}

/// A single structured key/value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub key: String,
    /// Field value
    pub value: serde_json::Value,
}

impl Field {
    /// Creates a new field.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered structured fields for the `*w` call shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValues(Vec<Field>);

impl KeyValues {
    /// Creates an empty field list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a typed key/value pair.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.push(Field::new(key, value));
        self
    }

    /// Builds fields from a loose, alternating `key, value, key, value, ...` list.
    ///
    /// Keys that are not strings are stringified. A trailing key without a value
    /// is kept and paired with [`MISSING_VALUE`] rather than dropped.
    #[must_use]
    pub fn from_flat(items: impl IntoIterator<Item = serde_json::Value>) -> Self {
        let mut fields = Vec::new();
        let mut iter = items.into_iter();
        while let Some(key) = iter.next() {
            let key = match key {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            let value = iter
                .next()
                .unwrap_or_else(|| serde_json::Value::String(MISSING_VALUE.to_string()));
            fields.push(Field { key, value });
        }
        Self(fields)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the fields in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Field] {
        &self.0
    }

    /// Consumes the list, returning the fields.
    #[must_use]
    pub fn into_inner(self) -> Vec<Field> {
        self.0
    }
}

impl FromIterator<Field> for KeyValues {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> From<Vec<(K, V)>> for KeyValues {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().map(|(k, v)| Field::new(k, v)).collect()
    }
}

/// A log event on its way through the router.
///
/// Built per call and consumed synchronously; never shared between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// When the event was created
    pub timestamp: DateTime<Local>,
    /// Severity level
    pub severity: Severity,
    /// Where the event was emitted
    pub caller: Caller,
    /// Fully rendered message
    pub message: String,
    /// Structured fields, in order
    pub fields: Vec<Field>,
}

impl LogEvent {
    /// Creates an event stamped with the current local time.
    #[must_use]
    pub fn new(severity: Severity, caller: Caller, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            caller,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Attaches structured fields.
    #[must_use]
    pub fn with_fields(mut self, fields: KeyValues) -> Self {
        self.fields = fields.into_inner();
        self
    }
}
