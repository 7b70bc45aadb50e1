//! Severity gates and routing modes.
//!
//! A [`LevelGate`] decides whether one [`Bucket`] accepts an event of a given
//! [`Severity`]. The ERROR bucket always takes `ERROR` and above; what the INFO
//! bucket takes depends on the process [`Mode`]:
//!
//! | Mode          | INFO bucket accepts      |
//! |---------------|--------------------------|
//! | `contain`     | `INFO..=FATAL`           |
//! | `independent` | `INFO..ERROR`            |
//! | anything else | same as `contain`        |
//!
//! `DEBUG` reaches no bucket.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Severity;

/// Process-wide routing topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// INFO bucket receives everything from `INFO` up, including what the
    /// ERROR bucket also receives.
    Contain,
    /// INFO and ERROR buckets partition the severity space.
    Independent,
    /// No or unrecognized mode configured; behaves like [`Mode::Contain`].
    #[default]
    Unspecified,
}

impl Mode {
    /// Interprets the configured mode string.
    ///
    /// Only the exact spellings `contain` and `independent` select a mode.
    /// Anything else, including other cases or padding, yields
    /// [`Mode::Unspecified`].
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("contain") => Self::Contain,
            Some("independent") => Self::Independent,
            _ => Self::Unspecified,
        }
    }

    /// Returns the configuration spelling of this mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Contain => "contain",
            Self::Independent => "independent",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two routing and rotation destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bucket {
    /// Informational bucket
    Info,
    /// Error bucket
    Error,
}

impl Bucket {
    /// Both buckets, in routing order.
    pub const ALL: [Self; 2] = [Self::Info, Self::Error];

    /// Returns the configuration section name of this bucket.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure predicate deciding whether a bucket accepts a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelGate {
    bucket: Bucket,
    mode: Mode,
}

impl LevelGate {
    /// Creates the gate guarding `bucket` under `mode`.
    #[must_use]
    pub const fn new(bucket: Bucket, mode: Mode) -> Self {
        Self { bucket, mode }
    }

    /// Returns the guarded bucket.
    #[must_use]
    pub const fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// Returns the mode the gate was built for.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns true if the bucket accepts events of `severity`.
    #[must_use]
    pub fn accepts(&self, severity: Severity) -> bool {
        match (self.bucket, self.mode) {
            (Bucket::Error, _) => severity >= Severity::Error,
            (Bucket::Info, Mode::Independent) => {
                severity >= Severity::Info && severity < Severity::Error
            }
            (Bucket::Info, Mode::Contain | Mode::Unspecified) => severity >= Severity::Info,
        }
    }

    /// Returns the accepted severities in ascending order.
    #[must_use]
    pub fn accepted(&self) -> Vec<Severity> {
        Severity::ALL
            .into_iter()
            .filter(|s| self.accepts(*s))
            .collect()
    }
}
