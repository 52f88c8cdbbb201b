//! Logging utilities for the Pushgate application.
//!
//! This module provides a standardized approach to logging across all crates
//! in the workspace. It installs a `tracing` subscriber with a formatted
//! stdout layer and, when configured, a daily rolling file layer.

use pushgate_config::LoggingConfig;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::GatewayError;

/// Builds the filter: `RUST_LOG` if present, plus a directive for the `pushgate` targets.
fn build_filter(level: &str) -> Result<EnvFilter, GatewayError> {
    let directive = format!("pushgate={}", level)
        .parse()
        .map_err(|err| GatewayError::LoggingError(format!("invalid log level {level}: {err}")))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Initialize the tracing subscriber at INFO level.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
pub fn init_with_level(level: Level) {
    let Ok(filter) = build_filter(level.as_str()) else {
        return;
    };

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize the tracing subscriber from the logging configuration.
///
/// When `config.directory` is set, log lines are also written to
/// `{directory}/pushgate.log.YYYY-MM-DD`. The returned guard flushes the file
/// writer on drop and must be kept alive for the lifetime of the process.
pub fn init_with_config(config: &LoggingConfig) -> Result<Option<WorkerGuard>, GatewayError> {
    let filter = build_filter(&config.level)?;

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "pushgate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .with(file_layer)
        .with(filter)
        .try_init()
        .map_err(|err| GatewayError::LoggingError(err.to_string()))?;

    info!(level = %config.level, directory = ?config.directory, "Logging initialized");
    Ok(guard)
}

/// Log an error with context at the ERROR level.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    tracing::error!("{}: {}", context, error);
}
