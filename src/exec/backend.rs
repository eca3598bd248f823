// src/exec/backend.rs

//! Pluggable script executor abstraction.
//!
//! The batch runner talks to a `ScriptExecutor` instead of spawning
//! processes itself. This makes it easy to swap in a fake executor in tests
//! while keeping the production implementation in [`task_runner`].
//!
//! [`task_runner`]: super::task_runner

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::engine::{ExecutionResult, UnitName};
use crate::registry::Unit;

use super::task_runner::run_script_process;

/// One command to run for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    pub unit: UnitName,
    /// Display label (usually the colored unit name) used as output prefix.
    pub label: String,
    pub command: String,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl ScriptRequest {
    /// Request running `command` in `unit`'s directory.
    ///
    /// `base_env` is extended with `MONORUN_UNIT_NAME` and
    /// `MONORUN_UNIT_VERSION`.
    pub fn for_unit(unit: &Unit, command: &str, base_env: &BTreeMap<String, String>) -> Self {
        let mut env = base_env.clone();
        env.insert("MONORUN_UNIT_NAME".to_string(), unit.name.clone());
        env.insert("MONORUN_UNIT_VERSION".to_string(), unit.version.clone());

        Self {
            unit: unit.name.clone(),
            label: unit.display_name().to_string(),
            command: command.to_string(),
            cwd: unit.dir.clone(),
            env,
        }
    }
}

/// Trait abstracting how a unit's command is executed.
///
/// Implementations must report failure through the returned
/// [`ExecutionResult`], never by panicking.
pub trait ScriptExecutor: Send + Sync {
    fn execute(
        &self,
        request: ScriptRequest,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>>;
}

/// Real executor used in production: runs commands through the platform
/// shell.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    forward_output: bool,
}

impl ShellExecutor {
    /// `forward_output = true` echoes each output line with the unit prefix;
    /// otherwise lines are only logged at debug level.
    pub fn new(forward_output: bool) -> Self {
        Self { forward_output }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ScriptExecutor for ShellExecutor {
    fn execute(
        &self,
        request: ScriptRequest,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>> {
        let forward = self.forward_output;
        Box::pin(async move { run_script_process(&request, forward).await })
    }
}
