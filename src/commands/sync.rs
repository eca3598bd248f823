// src/commands/sync.rs

//! `monorun sync`: make every dependency on a local unit require that
//! unit's current version.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::commands::Workspace;
use crate::errors::Result;
use crate::registry::manifest::{pinned_requirement, rewrite_local_versions};

pub async fn sync_versions(ws: &Workspace) -> Result<bool> {
    let versions: Arc<HashMap<String, String>> = Arc::new(ws.registry.versions());
    let units = ws.matched_units();

    if ws.dry_run {
        for unit in &units {
            for (name, requirement) in unit.dependency_pairs() {
                let Some(version) = versions.get(&name) else {
                    continue;
                };
                if let Some(new) = pinned_requirement(&requirement, version) {
                    if new != requirement {
                        println!("{}: {name} {requirement} -> {new}", unit.display_name());
                    }
                }
            }
        }
        return Ok(true);
    }

    let fs = Arc::clone(&ws.fs);
    let results = ws
        .runner
        .run_sequential(units.iter().map(|u| (u.name.clone(), u.manifest_path.clone())), |(name, path)| {
            let fs = Arc::clone(&fs);
            let versions = Arc::clone(&versions);
            async move {
                let rewritten = rewrite_local_versions(fs.as_ref(), &path, &versions);
                match &rewritten {
                    Ok(changed) => info!(unit = %name, changed, "manifest synced"),
                    Err(err) => error!(unit = %name, error = %err, "manifest sync failed"),
                }
                rewritten
            }
        })
        .await;

    Ok(results.iter().all(|r| r.is_ok()))
}
