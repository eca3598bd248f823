// src/registry/mod.rs

//! Unit registry: the ordered collection of discovered units.
//!
//! - [`discovery`] walks the tree and finds manifest files.
//! - [`manifest`] reads and rewrites manifest files.
//! - [`unit`] holds the immutable `Unit` value.
//! - [`selection`] keeps the per-run `matched` / `mark_for_build` flags.

pub mod discovery;
pub mod manifest;
pub mod selection;
pub mod unit;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petgraph::graphmap::DiGraphMap;
use tracing::info;

use crate::errors::{MonorunError, Result};
use crate::fs::FileSystem;

pub use discovery::{discover_manifests, DiscoveryOptions};
pub use manifest::Manifest;
pub use selection::{Selection, SelectionFlags};
pub use unit::{Unit, UnitId};

#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    by_name: HashMap<String, UnitId>,
}

impl UnitRegistry {
    /// Discover and load every unit under `root`.
    pub fn discover(fs: &dyn FileSystem, root: &Path, options: &DiscoveryOptions) -> Result<Self> {
        let paths = discover_manifests(fs, root, options)?;
        let registry = Self::from_manifest_paths(fs, &paths)?;
        info!(root = ?root, units = registry.len(), "discovered units");
        Ok(registry)
    }

    /// Build a registry from manifest paths; ids follow the given order.
    pub fn from_manifest_paths(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<Self> {
        let mut units: Vec<Unit> = Vec::with_capacity(paths.len());
        let mut by_name: HashMap<String, UnitId> = HashMap::new();

        for (index, path) in paths.iter().enumerate() {
            let manifest = manifest::read_manifest(fs, path)?;
            let unit = Unit::from_manifest(UnitId(index), path, manifest);

            if let Some(existing) = by_name.get(&unit.name) {
                return Err(MonorunError::DuplicateUnit {
                    name: unit.name,
                    first: units[existing.0].manifest_path.clone(),
                    second: path.clone(),
                });
            }

            by_name.insert(unit.name.clone(), unit.id);
            units.push(unit);
        }

        Ok(Self { units, by_name })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&Unit> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Units for the given ids, in the order of `ids`. Unknown ids are dropped.
    pub fn select(&self, ids: &[UnitId]) -> Vec<&Unit> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Dependencies of a unit that are themselves units in this registry.
    pub fn local_dependencies(&self, id: UnitId) -> Vec<UnitId> {
        let Some(unit) = self.get(id) else {
            return Vec::new();
        };
        unit.dependency_pairs()
            .iter()
            .filter_map(|(name, _)| self.by_name.get(name).copied())
            .filter(|dep| *dep != id)
            .collect()
    }

    /// Edges point from a unit to each of its local dependencies.
    pub fn dependency_graph(&self) -> DiGraphMap<UnitId, ()> {
        let mut graph = DiGraphMap::new();
        for unit in &self.units {
            graph.add_node(unit.id);
        }
        for unit in &self.units {
            for dep in self.local_dependencies(unit.id) {
                graph.add_edge(unit.id, dep, ());
            }
        }
        graph
    }

    /// Current version of every unit, keyed by name.
    pub fn versions(&self) -> HashMap<String, String> {
        self.units
            .iter()
            .map(|u| (u.name.clone(), u.version.clone()))
            .collect()
    }
}
