//! # teelog
//!
//! Structured logging that tees records into two rotated files by severity.
//!
//! This crate provides:
//!
//! - [`Severity`]: Ordered levels (Debug, Info, Warn, Error, Fatal)
//! - [`Mode`] and [`LevelGate`]: Which bucket accepts which severity
//! - [`Router`]: Fan-out of each event to every accepting bucket
//! - [`JsonEncoder`]: One JSON object per line
//! - [`FileSink`]: Size-rotated files with count/age retention and gzip
//! - [`LoggingConfig`]: The `[TEELOG]` TOML configuration
//! - [`Logger`]: Positional, templated and structured calls per level
//!
//! ## Example
//!
//! ```rust,no_run
//! use teelog::{KeyValues, LoggingConfig};
//!
//! let config = LoggingConfig::from_file("teelog.toml")?;
//! let logger = teelog::build(&config);
//!
//! logger.info(&[&"service", &"started"]);
//! logger.warnf("queue depth {} above {}", &[&120, &100]);
//! logger.errorw("request failed", KeyValues::new().with("status", 503));
//!
//! logger.fatal(&[&"giving up"]).exit();
//! # Ok::<(), teelog::ConfigError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod encoder;
pub mod error;
pub mod facade;
pub mod gate;
pub mod router;
pub mod sink;
pub mod types;

// Re-export main types
pub use bootstrap::{build, config_path_from_env, global, init, init_or_exit, load};
pub use config::LoggingConfig;
pub use encoder::{Encoder, JsonEncoder};
pub use error::{ConfigError, LogError, Result};
pub use facade::{Fatal, Logger};
pub use gate::{Bucket, LevelGate, Mode};
pub use router::{Delivery, RouteEntry, Router};
pub use sink::{FileSink, RotatingSink, SinkSpec};
pub use types::{Caller, Field, KeyValues, LogEvent, Severity};
