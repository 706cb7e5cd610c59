// src/logging.rs

//! Logging setup for `monowatch` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order: the `--log-level` flag, the
//! `MONOWATCH_LOG` environment variable (full `EnvFilter` directives such as
//! `info,monowatch::engine=trace`), or [`DEFAULT_FILTER`].
//!
//! Logs go to STDERR; stdout carries the collated build output.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "MONOWATCH_LOG";

/// Used when neither the flag nor the environment says anything.
/// Watcher backends are chatty at debug level.
pub const DEFAULT_FILTER: &str = "info,notify=warn";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level_directive(level));
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|err| {
            eprintln!("monowatch: ignoring invalid {LOG_ENV_VAR}={directives:?}: {err}");
            EnvFilter::new(DEFAULT_FILTER)
        }),
        None => EnvFilter::new(DEFAULT_FILTER),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
