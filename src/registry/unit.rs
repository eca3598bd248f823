// src/registry/unit.rs

//! The `Unit` value type.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use colored::ColoredString;

use crate::color;
use crate::registry::manifest::{dependency_pairs, Manifest};

/// Identity of a unit: its position in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One discovered package.
///
/// Units are built once by the registry and never change afterwards;
/// selection flags live in [`crate::registry::Selection`].
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub version: String,
    /// Directory containing the manifest; scripts run here.
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub scripts: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Unit {
    pub fn from_manifest(id: UnitId, manifest_path: &Path, manifest: Manifest) -> Self {
        let dir = match manifest_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self {
            id,
            name: manifest.name,
            version: manifest.version,
            dir,
            manifest_path: manifest_path.to_path_buf(),
            scripts: manifest.scripts,
            dependencies: manifest.dependencies,
            dev_dependencies: manifest.dev_dependencies,
        }
    }

    /// Command for a script, or `None` if the unit doesn't declare it.
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// Palette index; equal to the discovery position.
    pub fn color_index(&self) -> usize {
        self.id.0
    }

    /// Name painted in the unit's color.
    pub fn display_name(&self) -> ColoredString {
        color::paint(&self.name, self.color_index())
    }

    pub fn dependency_pairs(&self) -> Vec<(String, String)> {
        dependency_pairs(&self.dependencies, &self.dev_dependencies)
    }
}
