// src/lib.rs

pub mod cli;
pub mod color;
pub mod commands;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;

use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::commands::Workspace;
use crate::config::{load_or_default, resolve_concurrency};
use crate::engine::{BatchRunner, RunMode};
use crate::errors::Result;
use crate::exec::ShellExecutor;
use crate::fs::RealFileSystem;
use crate::registry::{DiscoveryOptions, Selection, UnitRegistry};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the concurrency limit
/// - unit discovery and selection
/// - the batch runner with its bounded queue
/// - the shell executor
///
/// Returns the overall verdict of the command.
pub async fn run(args: CliArgs) -> Result<bool> {
    if args.no_color {
        color::disable_colors();
    }

    let cfg = load_or_default(args.config.as_deref(), &args.root)?;
    let concurrency = resolve_concurrency(args.concurrency, &cfg)?;

    let fs = Arc::new(RealFileSystem);
    let registry = UnitRegistry::discover(
        fs.as_ref(),
        &args.root,
        &DiscoveryOptions::from(&cfg.config),
    )?;

    // Selection is settled here, before anything runs concurrently.
    let mut selection = Selection::from_filters(&registry, &args.filters)?;
    selection.propagate_to_dependencies(&registry);

    let mode = if args.sequential {
        RunMode::Sequential
    } else {
        RunMode::Parallel
    };
    info!(
        units = registry.len(),
        concurrency = concurrency.get(),
        ?mode,
        "workspace ready"
    );

    let workspace = Workspace {
        root: args.root.clone(),
        config: cfg,
        fs,
        registry,
        selection,
        runner: BatchRunner::new(concurrency),
        executor: Arc::new(ShellExecutor::default()),
        mode,
        dry_run: args.dry_run,
    };
    debug!(?workspace, command = ?args.command, "dispatching command");

    commands::execute(&workspace, &args.command).await
}
