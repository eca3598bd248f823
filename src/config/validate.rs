// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MonorunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = MonorunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.commands, raw.env))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_concurrency(cfg)?;
    validate_names(cfg)?;
    validate_commands(cfg)?;
    Ok(())
}

fn validate_concurrency(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.concurrency == Some(0) {
        return Err(MonorunError::ConfigError(
            "[config].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.config;
    for (key, value) in [("cache_dir", &section.cache_dir), ("manifest", &section.manifest)] {
        if value.trim().is_empty() {
            return Err(MonorunError::ConfigError(format!(
                "[config].{key} must not be empty"
            )));
        }
        if value.contains('/') || value.contains('\\') {
            return Err(MonorunError::ConfigError(format!(
                "[config].{key} must be a plain file name, got '{value}'"
            )));
        }
    }

    if let Some(shared) = &section.shared_config {
        if shared.trim().is_empty() {
            return Err(MonorunError::ConfigError(
                "[config].shared_config must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.commands.install.trim().is_empty() {
        return Err(MonorunError::ConfigError(
            "[commands].install must not be empty".to_string(),
        ));
    }
    Ok(())
}
