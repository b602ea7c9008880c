// src/errors.rs

//! Crate-wide error type and exit-status mapping.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Per-context failures collected by the parallel coordinator.
///
/// Keys are context names (usually platforms); values are the rendered
/// failure messages. `succeeded` lists the contexts that completed fine so
/// callers can print a partial-success report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionFailures {
    pub failures: BTreeMap<String, String>,
    pub succeeded: Vec<String>,
}

impl fmt::Display for ActionFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .failures
            .iter()
            .map(|(ctx, msg)| format!("[{ctx}] {msg}"))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum SpkError {
    #[error("Circular dependency found: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("`{}' both in [{}] and [{}] category", .projects.join(" "), .first, .second)]
    Conflict {
        projects: Vec<String>,
        first: &'static str,
        second: &'static str,
    },

    #[error("No such platform: {platform} (section [{section}] has no `default` entry)")]
    MissingPlatform { platform: String, section: String },

    #[error("No platform available: {0}")]
    NoPlatformAvailable(String),

    #[error("Build action failed on {n} context(s): {0}", n = .0.failures.len())]
    BuildActionFailed(ActionFailures),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpkError {
    /// Process exit status for this error.
    ///
    /// Structural problems get distinct codes so wrapper scripts can tell a
    /// bad request (cycle, conflict, platform) apart from a failed build.
    pub fn exit_code(&self) -> i32 {
        match self {
            SpkError::CircularDependency { .. } => 2,
            SpkError::Conflict { .. } => 3,
            SpkError::MissingPlatform { .. } | SpkError::NoPlatformAvailable(_) => 4,
            SpkError::BuildActionFailed(_) => 5,
            SpkError::Interrupted => 130,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpkError>;
