// src/registry/selection.rs

//! Per-run selection state for units.
//!
//! `matched` means a unit was picked by the user's filters; `mark_for_build`
//! means it has to be built, either because it was matched or because a
//! matched unit depends on it. Flags are only ever set, never cleared.

use std::collections::HashMap;

use globset::{Glob, GlobSet, GlobSetBuilder};
use petgraph::visit::Dfs;
use tracing::debug;

use crate::errors::{MonorunError, Result};
use crate::registry::unit::UnitId;
use crate::registry::UnitRegistry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionFlags {
    pub matched: bool,
    pub mark_for_build: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    flags: HashMap<UnitId, SelectionFlags>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the units whose name matches any of `filters` (glob syntax).
    /// No filters selects every unit.
    pub fn from_filters(registry: &UnitRegistry, filters: &[String]) -> Result<Self> {
        let mut selection = Self::new();

        if filters.is_empty() {
            for unit in registry.iter() {
                selection.mark_matched(unit.id);
            }
            return Ok(selection);
        }

        let set = build_globset(filters)?;
        for unit in registry.iter() {
            if set.is_match(&unit.name) {
                selection.mark_matched(unit.id);
            }
        }

        debug!(
            filters = ?filters,
            matched = selection.matched_ids(registry).len(),
            "applied unit filters"
        );
        Ok(selection)
    }

    /// Mark as matched. Always implies `mark_for_build`.
    pub fn mark_matched(&mut self, id: UnitId) {
        let entry = self.flags.entry(id).or_default();
        entry.matched = true;
        entry.mark_for_build = true;
    }

    pub fn mark_for_build(&mut self, id: UnitId) {
        self.flags.entry(id).or_default().mark_for_build = true;
    }

    pub fn flags(&self, id: UnitId) -> SelectionFlags {
        self.flags.get(&id).copied().unwrap_or_default()
    }

    pub fn is_matched(&self, id: UnitId) -> bool {
        self.flags(id).matched
    }

    pub fn is_marked_for_build(&self, id: UnitId) -> bool {
        self.flags(id).mark_for_build
    }

    /// Matched units in registry order.
    pub fn matched_ids(&self, registry: &UnitRegistry) -> Vec<UnitId> {
        registry
            .iter()
            .map(|u| u.id)
            .filter(|id| self.is_matched(*id))
            .collect()
    }

    /// Units marked for build in registry order.
    pub fn marked_for_build_ids(&self, registry: &UnitRegistry) -> Vec<UnitId> {
        registry
            .iter()
            .map(|u| u.id)
            .filter(|id| self.is_marked_for_build(*id))
            .collect()
    }

    /// Mark every local unit reachable from a marked unit through its
    /// dependencies, transitively.
    pub fn propagate_to_dependencies(&mut self, registry: &UnitRegistry) {
        let graph = registry.dependency_graph();
        let seeds: Vec<UnitId> = self.marked_for_build_ids(registry);

        for seed in seeds {
            let mut dfs = Dfs::new(&graph, seed);
            while let Some(id) = dfs.next(&graph) {
                if !self.is_marked_for_build(id) {
                    debug!(unit = %id, via = %seed, "marking dependency for build");
                    self.mark_for_build(id);
                }
            }
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            MonorunError::ConfigError(format!("invalid --filter pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| MonorunError::ConfigError(format!("building filter set: {e}")))
}
