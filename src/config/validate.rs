// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, STAGE_ORDER};
use crate::errors::{Result, SpkError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SpkError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_stages(cfg)?;
    validate_env(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.libc_project.trim().is_empty() {
        return Err(SpkError::ConfigError(
            "[config].libc_project must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_stages(cfg: &RawConfigFile) -> Result<()> {
    for (name, stage) in cfg.stage.iter() {
        if !STAGE_ORDER.contains(&name.as_str()) {
            return Err(SpkError::ConfigError(format!(
                "unknown stage '{}' (expected one of: {})",
                name,
                STAGE_ORDER.join(", ")
            )));
        }
        if stage.cmd.trim().is_empty() {
            return Err(SpkError::ConfigError(format!(
                "stage '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    if !cfg.stage.is_empty() && cfg.env.versions.is_empty() {
        return Err(SpkError::ConfigError(
            "[env.versions] must name at least one toolkit version when stages are configured"
                .to_string(),
        ));
    }
    if cfg.env.chroot.trim().is_empty() {
        return Err(SpkError::ConfigError(
            "[env].chroot must not be empty".to_string(),
        ));
    }
    Ok(())
}
