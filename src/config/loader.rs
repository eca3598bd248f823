// src/config/loader.rs

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MonorunError, Result};

/// Environment variable that overrides `[config].concurrency`.
pub const CONCURRENCY_ENV: &str = "MONORUN_CONCURRENCY";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the config the CLI points at.
///
/// - An explicit path must exist.
/// - Without one, `Monorun.toml` in `root` is used if present, otherwise the
///   built-in defaults apply.
pub fn load_or_default(explicit: Option<&Path>, root: &Path) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let candidate = default_config_path(root);
    if candidate.is_file() {
        debug!(path = ?candidate, "loading config file");
        load_and_validate(candidate)
    } else {
        debug!(path = ?candidate, "no config file found; using defaults");
        Ok(ConfigFile::default())
    }
}

/// Default config location for a workspace root.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join("Monorun.toml")
}

/// Resolve the effective concurrency limit K.
///
/// Priority:
/// 1. `--concurrency` CLI flag
/// 2. `MONORUN_CONCURRENCY` environment variable
/// 3. `[config].concurrency`
/// 4. number of available CPUs
pub fn resolve_concurrency(cli: Option<usize>, cfg: &ConfigFile) -> Result<NonZeroUsize> {
    let env_value = std::env::var(CONCURRENCY_ENV).ok();
    resolve_concurrency_from(cli, env_value.as_deref(), cfg)
}

pub fn resolve_concurrency_from(
    cli: Option<usize>,
    env_value: Option<&str>,
    cfg: &ConfigFile,
) -> Result<NonZeroUsize> {
    if let Some(k) = cli {
        return NonZeroUsize::new(k).ok_or_else(|| {
            MonorunError::ConfigError("--concurrency must be >= 1 (got 0)".to_string())
        });
    }

    if let Some(raw) = env_value {
        let parsed = raw.trim().parse::<usize>().ok().and_then(NonZeroUsize::new);
        return parsed.ok_or_else(|| {
            MonorunError::ConfigError(format!(
                "{CONCURRENCY_ENV} must be a positive integer (got '{raw}')"
            ))
        });
    }

    Ok(cfg.concurrency())
}
