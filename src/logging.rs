// src/logging.rs

//! stderr logging for `ibazel`.
//!
//! stdout belongs to bazel and the supervised child, so every status line goes
//! to stderr. The filter is taken from, in order:
//! 1. `--log-level`, applied to every target;
//! 2. `IBAZEL_LOG`, in `EnvFilter` directive syntax (`debug`,
//!    `ibazel=debug,notify=warn`, ...);
//! 3. `info`, also used when `IBAZEL_LOG` is blank.

use anyhow::{anyhow, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "IBAZEL_LOG";

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

/// Resolve the flag and the environment into one filter.
///
/// Unparsable directives in `env` are dropped rather than rejected.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::default().add_directive(LevelFilter::from(level).into());
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(directives),
        None => EnvFilter::default().add_directive(LevelFilter::INFO.into()),
    }
}
