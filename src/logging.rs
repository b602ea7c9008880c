// src/logging.rs

//! Process-wide `tracing` subscriber.
//!
//! The level comes from `--log-level`, then `SPKFORGE_LOG`, and is `info`
//! otherwise. Everything is written to stderr because stdout is reserved
//! for the project lists and batches wrapper scripts parse.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "SPKFORGE_LOG";

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Install the subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = cli_level.map(Level::from).unwrap_or_else(|| {
        std::env::var(LOG_ENV)
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::INFO)
    });

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("cannot install log subscriber: {e}"))
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_level_strings() {
        assert_eq!(parse_level_str(" Debug "), Some(Level::DEBUG));
        assert_eq!(parse_level_str("warning"), Some(Level::WARN));
        assert_eq!(parse_level_str("verbose"), None);
    }

    #[test]
    fn cli_level_maps_onto_tracing() {
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }
}
