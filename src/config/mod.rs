// src/config/mod.rs

//! Configuration loading and validation for monorun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like a non-zero concurrency (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default, resolve_concurrency};
pub use model::{CommandsSection, ConfigFile, ConfigSection, RawConfigFile};
pub use validate::validate_config;
