//! teelog binary entrypoint.
//!
//! Loads the logging configuration, then either writes one record through the
//! configured logger or prints how records would be routed.

mod cli;

use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use teelog::bootstrap::CONFIG_EXIT_CODE;
use teelog::facade::{FATAL_EXIT_CODE, join_args, render_template};
use teelog::{
    Bucket, ConfigError, KeyValues, LevelGate, LogError, Logger, LoggingConfig, Severity,
};

use crate::cli::{Cli, Commands, EmitArgs};

fn main() -> ExitCode {
    // Diagnostics of the logger itself go to stderr, never into the log files.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) if is_config_error(&e) => {
            eprintln!("teelog: {e}");
            ExitCode::from(CONFIG_EXIT_CODE)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Commands::Emit(args) => {
            let logger = teelog::init(&cli.config)?;
            Ok(emit(logger, args))
        }
        Commands::Check => {
            let config = LoggingConfig::from_file(&cli.config)?;
            let mut stdout = io::stdout().lock();
            check(&mut stdout, &cli.config, &config).context("failed to write routing table")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Returns true if `err` means the configuration could not be trusted.
fn is_config_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ConfigError>().is_some()
        || matches!(err.downcast_ref::<LogError>(), Some(LogError::Config(_)))
}

fn emit(logger: &Logger, args: &EmitArgs) -> ExitCode {
    let values: Vec<&dyn Display> = args.args.iter().map(|a| a as &dyn Display).collect();
    let message = if args.template {
        render_template(&args.message, &values)
    } else {
        let mut parts: Vec<&dyn Display> = Vec::with_capacity(values.len() + 1);
        parts.push(&args.message);
        parts.extend(values);
        join_args(&parts)
    };
    let fields = KeyValues::from(args.fields.clone());

    if args.level == Severity::Fatal {
        let fatal = logger.fatalw(&message, fields);
        debug!(%fatal, unsynced = fatal.unsynced(), "fatal record flushed");
        return ExitCode::from(FATAL_EXIT_CODE);
    }

    let delivery = logger.log(args.level, &message, fields);
    debug!(
        level = %args.level,
        delivered = delivery.delivered,
        failed = delivery.failed,
        "emitted record"
    );
    ExitCode::SUCCESS
}

fn check(out: &mut impl Write, path: &Path, config: &LoggingConfig) -> io::Result<()> {
    writeln!(out, "config: {}", path.display())?;
    writeln!(out, "mode: {}", config.mode)?;
    for bucket in Bucket::ALL {
        let spec = config.sink(bucket);
        let accepted: Vec<&str> = LevelGate::new(bucket, config.mode)
            .accepted()
            .iter()
            .map(Severity::as_str)
            .collect();
        writeln!(
            out,
            "{:<5} {} accepts {} (rotate at {} bytes, keep {} backups, {} days, compress {})",
            bucket.as_str(),
            spec.file_path.display(),
            accepted.join(", "),
            spec.max_bytes(),
            spec.max_backups,
            spec.max_age_days,
            spec.compress
        )?;
    }
    Ok(())
}
