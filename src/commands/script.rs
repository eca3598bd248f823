// src/commands/script.rs

use std::sync::Arc;

use tracing::{info, warn};

use crate::commands::Workspace;
use crate::engine::ScriptReport;
use crate::errors::{MonorunError, Result};
use crate::registry::Unit;

/// Run `script` in every given unit that declares it.
///
/// With `require_declared`, it is an error if none of the units declares the
/// script (a typo in `monorun run <script>` should not pass silently).
pub async fn run_script(
    ws: &Workspace,
    script: &str,
    units: Vec<&Unit>,
    require_declared: bool,
) -> Result<bool> {
    if require_declared && !units.is_empty() && !units.iter().any(|u| u.has_script(script)) {
        return Err(MonorunError::UnknownScript(script.to_string()));
    }

    if ws.dry_run {
        for unit in units.iter().filter(|u| u.has_script(script)) {
            println!(
                "{} {}: {}",
                unit.display_name(),
                script,
                unit.script(script).unwrap_or_default()
            );
        }
        return Ok(true);
    }

    let report = ws
        .runner
        .run_script(
            &units,
            script,
            Arc::clone(&ws.executor),
            &ws.config.env,
            ws.mode,
        )
        .await;

    summarize(&report);
    Ok(report.success)
}

/// Log the final line of a batch.
pub fn summarize(report: &ScriptReport) {
    if report.success {
        info!(
            script = %report.script,
            ran = report.attempted.len(),
            skipped = report.skipped.len(),
            "all units succeeded"
        );
    } else {
        warn!(
            script = %report.script,
            failed = ?report.failed,
            "{} of {} units failed",
            report.failed.len(),
            report.attempted.len()
        );
    }
}
