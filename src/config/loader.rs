// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for the
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load and validate a configuration file, then anchor its relative paths
/// at the config file's directory.
///
/// A missing file at the default location is not an error: the defaults
/// describe the usual source-tree layout.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = if !path.exists() && path == default_config_path() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        RawConfigFile::default()
    } else {
        load_from_path(path)?
    };

    let mut config = ConfigFile::try_from(raw_config)?;

    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    anchor_paths(&mut config, &base);

    Ok(config)
}

fn anchor_paths(config: &mut ConfigFile, base: &Path) {
    let anchor = |p: &PathBuf| {
        if p.is_absolute() {
            p.clone()
        } else {
            base.join(p)
        }
    };
    config.paths.project_depends = anchor(&config.paths.project_depends);
    config.paths.source_dir = anchor(&config.paths.source_dir);
}

/// Default config path: `Spkforge.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Spkforge.toml")
}
