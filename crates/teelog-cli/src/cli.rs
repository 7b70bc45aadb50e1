//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use teelog::Severity;
use teelog::bootstrap::{CONFIG_ENV, DEFAULT_CONFIG_FILE};

/// teelog - route records into INFO and ERROR log files.
#[derive(Parser, Debug, Clone)]
#[command(name = "teelog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, global = true, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write one record through the configured logger.
    ///
    /// A FATAL record is flushed to disk and the process exits with status 1.
    Emit(EmitArgs),

    /// Validate the configuration and print the routing table.
    Check,
}

/// Arguments for `emit`.
#[derive(Args, Debug, Clone)]
pub struct EmitArgs {
    /// Severity of the record (debug, info, warn, error, fatal).
    #[arg(short, long, default_value_t = Severity::Info)]
    pub level: Severity,

    /// Treat MESSAGE as a template and substitute ARGS into it.
    #[arg(short, long)]
    pub template: bool,

    /// Message, or template with `--template`.
    pub message: String,

    /// Values appended to the message, or substituted into the template.
    pub args: Vec<String>,

    /// Structured field as KEY=VALUE. VALUE is read as JSON when it parses,
    /// otherwise as a string.
    #[arg(short, long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, Value)>,
}

/// Parses a `KEY=VALUE` field argument.
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is empty.
pub fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("field key is empty in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
