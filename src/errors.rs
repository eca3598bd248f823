// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonorunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Malformed manifest {path:?}: {message}")]
    ManifestError { path: PathBuf, message: String },

    #[error("Duplicate unit name '{name}' in {first:?} and {second:?}")]
    DuplicateUnit {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("No selected unit declares script '{0}'")]
    UnknownScript(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a submitted task did not produce a value.
///
/// Only the handle of the offending task is rejected with this; sibling
/// tasks in the queue are unaffected.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task failed: {0:#}")]
    Failed(anyhow::Error),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was dropped before it settled")]
    Abandoned,
}

impl TaskError {
    pub(crate) fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::from_panic(err.into_panic())
        } else {
            TaskError::Abandoned
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        TaskError::Panicked(message)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MonorunError>;
