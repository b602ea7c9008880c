// src/config/mod.rs

//! Configuration loading and validation for spkforge.
//!
//! Responsibilities:
//! - Define the TOML-backed tool configuration (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate stage and environment settings (`validate.rs`).
//! - Parse the sectioned dependency declaration files (`depends_file.rs`).

pub mod depends_file;
pub mod loader;
pub mod model;
pub mod validate;

pub use depends_file::{DependsFile, Section, SectionHeader};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, EnvSection, RawConfigFile, StageConfig};
