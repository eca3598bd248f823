// src/config/model.rs

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use serde::Deserialize;

/// Top-level configuration as read from `Monorun.toml`.
///
/// ```toml
/// [config]
/// concurrency = 4
/// cache_dir = "node_modules"
/// manifest = "package.json"
/// shared_config = ".npmrc"
///
/// [commands]
/// install = "npm install"
///
/// [env]
/// CI = "1"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub commands: CommandsSection,

    /// Extra environment variables passed to every script.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Validated configuration. Only constructible through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub commands: CommandsSection,
    pub env: BTreeMap<String, String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        commands: CommandsSection,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self {
            config,
            commands,
            env,
        }
    }

    /// Effective concurrency limit from the file, falling back to the number
    /// of available CPUs when unset.
    pub fn concurrency(&self) -> NonZeroUsize {
        self.config
            .concurrency
            .and_then(NonZeroUsize::new)
            .unwrap_or_else(default_concurrency)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.config, raw.commands, raw.env)
    }
}

pub fn default_concurrency() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of unit operations in flight (K). Must be >= 1.
    ///
    /// If `None`, the number of available CPUs is used.
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Directory name skipped during discovery.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// File name that marks a directory as a unit.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Whether the manifest sitting directly in the root counts as a unit.
    /// Set to `false` when the root manifest only describes the workspace.
    #[serde(default = "default_include_root")]
    pub include_root: bool,

    /// File in the root that is copied into every unit for `install` and
    /// removed again afterwards.
    #[serde(default)]
    pub shared_config: Option<String>,
}

fn default_cache_dir() -> String {
    "node_modules".to_string()
}

fn default_manifest() -> String {
    "package.json".to_string()
}

fn default_include_root() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            concurrency: None,
            cache_dir: default_cache_dir(),
            manifest: default_manifest(),
            include_root: default_include_root(),
            shared_config: None,
        }
    }
}

/// `[commands]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandsSection {
    /// Command run in every selected unit by `monorun install`.
    #[serde(default = "default_install")]
    pub install: String,
}

fn default_install() -> String {
    "npm install".to_string()
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            install: default_install(),
        }
    }
}
