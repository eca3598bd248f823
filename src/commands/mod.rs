// src/commands/mod.rs

//! User-facing commands.
//!
//! Each command picks its units from the [`Workspace`] selection and hands
//! them to the batch runner; the returned `bool` is the overall verdict.

pub mod install;
pub mod list;
pub mod script;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Command;
use crate::config::ConfigFile;
use crate::engine::{BatchRunner, RunMode};
use crate::errors::Result;
use crate::exec::ScriptExecutor;
use crate::fs::FileSystem;
use crate::registry::{Selection, Unit, UnitRegistry};

/// Everything a command needs, resolved once at startup.
pub struct Workspace {
    pub root: PathBuf,
    pub config: ConfigFile,
    pub fs: Arc<dyn FileSystem>,
    pub registry: UnitRegistry,
    pub selection: Selection,
    pub runner: BatchRunner,
    pub executor: Arc<dyn ScriptExecutor>,
    pub mode: RunMode,
    pub dry_run: bool,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("units", &self.registry.len())
            .field("mode", &self.mode)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Matched units in discovery order.
    pub fn matched_units(&self) -> Vec<&Unit> {
        self.registry
            .select(&self.selection.matched_ids(&self.registry))
    }

    /// Units marked for build in discovery order.
    pub fn build_units(&self) -> Vec<&Unit> {
        self.registry
            .select(&self.selection.marked_for_build_ids(&self.registry))
    }
}

/// Dispatch a CLI command.
pub async fn execute(ws: &Workspace, command: &Command) -> Result<bool> {
    match command {
        Command::List => {
            list::list_units(ws);
            Ok(true)
        }
        Command::Run { script } => script::run_script(ws, script, ws.matched_units(), true).await,
        Command::Build => script::run_script(ws, "build", ws.build_units(), false).await,
        Command::Clean => script::run_script(ws, "clean", ws.matched_units(), false).await,
        Command::Install => install::install(ws).await,
        Command::Sync => sync::sync_versions(ws).await,
    }
}
