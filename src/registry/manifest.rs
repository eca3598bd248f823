// src/registry/manifest.rs

//! Reading and rewriting unit manifests (`package.json`).
//!
//! Only the fields the runner needs are typed. Rewrites go through a raw
//! `serde_json::Value` so unknown keys and key order survive untouched.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{MonorunError, Result};
use crate::fs::FileSystem;

const DEPENDENCY_SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

/// Typed view of a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Script name -> shell command.
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

/// Parse manifest text. `path` is only used for error messages.
pub fn parse_manifest(path: &Path, contents: &str) -> Result<Manifest> {
    let manifest: Manifest =
        serde_json::from_str(contents).map_err(|e| MonorunError::ManifestError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if manifest.name.trim().is_empty() {
        return Err(MonorunError::ManifestError {
            path: path.to_path_buf(),
            message: "\"name\" must not be empty".to_string(),
        });
    }

    Ok(manifest)
}

pub fn read_manifest(fs: &dyn FileSystem, path: &Path) -> Result<Manifest> {
    let contents = fs.read_to_string(path)?;
    parse_manifest(path, &contents)
}

/// All `(name, version requirement)` pairs of a manifest: regular
/// dependencies first, then dev dependencies, each in name order.
pub fn dependency_pairs(
    dependencies: &BTreeMap<String, String>,
    dev_dependencies: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    dependencies
        .iter()
        .chain(dev_dependencies.iter())
        .map(|(name, version)| (name.clone(), version.clone()))
        .collect()
}

/// New requirement string for a local dependency, keeping a leading `^` or
/// `~` from the old requirement.
///
/// Returns `None` for protocol requirements (`workspace:*`, `file:../x`)
/// which must not be rewritten.
pub fn pinned_requirement(old: &str, version: &str) -> Option<String> {
    let old = old.trim();
    if old.contains(':') {
        return None;
    }
    let prefix = match old.chars().next() {
        Some(c @ ('^' | '~')) => c.to_string(),
        _ => String::new(),
    };
    Some(format!("{prefix}{version}"))
}

/// Rewrite every dependency on a name in `local_versions` so it requires
/// that version. Returns the number of changed entries; the file is only
/// written when something changed.
pub fn rewrite_local_versions(
    fs: &dyn FileSystem,
    path: &Path,
    local_versions: &HashMap<String, String>,
) -> Result<usize> {
    let contents = fs.read_to_string(path)?;
    let mut doc: Value = serde_json::from_str(&contents).map_err(|e| {
        MonorunError::ManifestError {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let mut changed = 0;
    for section in DEPENDENCY_SECTIONS {
        let Some(deps) = doc.get_mut(section).and_then(Value::as_object_mut) else {
            continue;
        };
        for (name, requirement) in deps.iter_mut() {
            let (Some(version), Some(old)) = (local_versions.get(name), requirement.as_str())
            else {
                continue;
            };
            let Some(new) = pinned_requirement(old, version) else {
                continue;
            };
            if new != old {
                debug!(path = ?path, dependency = %name, from = %old, to = %new, "rewriting requirement");
                *requirement = Value::String(new);
                changed += 1;
            }
        }
    }

    if changed > 0 {
        let mut out = serde_json::to_string_pretty(&doc).map_err(anyhow::Error::from)?;
        out.push('\n');
        fs.write(path, out.as_bytes())?;
    }

    Ok(changed)
}
