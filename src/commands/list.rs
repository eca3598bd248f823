// src/commands/list.rs

use colored::Colorize;

use crate::commands::Workspace;

/// One line per unit: name, version, directory and selection markers.
pub fn list_units(ws: &Workspace) {
    for line in render_unit_lines(ws) {
        println!("{line}");
    }
}

pub fn render_unit_lines(ws: &Workspace) -> Vec<String> {
    ws.registry
        .iter()
        .map(|unit| {
            let flags = ws.selection.flags(unit.id);
            let marker = match (flags.matched, flags.mark_for_build) {
                (true, _) => "*",
                (false, true) => "+",
                (false, false) => " ",
            };
            let scripts: Vec<&str> = unit.scripts.keys().map(String::as_str).collect();
            format!(
                "{marker} {} {} {} [{}]",
                unit.display_name(),
                unit.version.dimmed(),
                unit.dir.display(),
                scripts.join(", ")
            )
        })
        .collect()
}
