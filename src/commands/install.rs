// src/commands/install.rs

//! `monorun install`: copy the shared config into each unit, run the install
//! command everywhere, then remove the copies again.
//!
//! Copy and removal run sequentially so filesystem operations never race;
//! the install itself runs through the bounded queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error};

use crate::commands::script::summarize;
use crate::commands::Workspace;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::registry::Unit;

pub async fn install(ws: &Workspace) -> Result<bool> {
    let units = ws.matched_units();
    let command = ws.config.commands.install.clone();

    if ws.dry_run {
        for unit in &units {
            println!("{} install: {}", unit.display_name(), command);
        }
        return Ok(true);
    }

    let copied = match ws.config.config.shared_config.as_deref() {
        Some(name) => copy_shared_config(ws, &units, name).await,
        None => Vec::new(),
    };
    let copies_ok = copied.iter().all(|c| c.is_ok());
    let copied: Vec<PathBuf> = copied.into_iter().filter_map(|c| c.ok().flatten()).collect();

    let report = ws
        .runner
        .run_command(
            &units,
            &command,
            Arc::clone(&ws.executor),
            &ws.config.env,
            ws.mode,
        )
        .await;
    summarize(&report);

    // Always clean up, even after a failed install.
    let removals = remove_copies(ws, copied).await;
    let removals_ok = removals.iter().all(|r| r.is_ok());

    Ok(copies_ok & report.success & removals_ok)
}

/// Copy `<root>/<name>` into every unit that doesn't already have one.
///
/// Returns one entry per unit: the created path, `None` when nothing was
/// copied, or the error.
async fn copy_shared_config(
    ws: &Workspace,
    units: &[&Unit],
    name: &str,
) -> Vec<anyhow::Result<Option<PathBuf>>> {
    let source = ws.root.join(name);
    if !ws.fs.is_file(&source) {
        debug!(path = ?source, "no shared config file; nothing to copy");
        return Vec::new();
    }

    let fs = Arc::clone(&ws.fs);
    ws.runner
        .run_sequential(units.iter().map(|u| u.dir.join(name)), |target| {
            let fs = Arc::clone(&fs);
            let source = source.clone();
            async move { copy_one(fs.as_ref(), &source, target) }
        })
        .await
}

fn copy_one(fs: &dyn FileSystem, source: &Path, target: PathBuf) -> anyhow::Result<Option<PathBuf>> {
    if fs.exists(&target) {
        debug!(path = ?target, "unit has its own copy; leaving it alone");
        return Ok(None);
    }
    if let Err(err) = fs.copy(source, &target) {
        error!(path = ?target, error = %err, "copying shared config failed");
        return Err(err);
    }
    Ok(Some(target))
}

async fn remove_copies(ws: &Workspace, copied: Vec<PathBuf>) -> Vec<anyhow::Result<()>> {
    let fs = Arc::clone(&ws.fs);
    ws.runner
        .run_sequential(copied, |path| {
            let fs = Arc::clone(&fs);
            async move {
                let removed = fs.remove_file(&path);
                if let Err(err) = &removed {
                    error!(path = ?path, error = %err, "removing shared config copy failed");
                }
                removed
            }
        })
        .await
}
