// src/registry/discovery.rs

//! Recursive manifest discovery.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, trace};

use crate::config::ConfigSection;
use crate::errors::Result;
use crate::fs::FileSystem;

/// What to look for while walking the tree.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// File name of a unit manifest (e.g. `package.json`).
    pub manifest: String,
    /// Directory name that is never entered (e.g. `node_modules`).
    pub cache_dir: String,
    /// Whether a manifest directly inside the root is reported (default).
    pub include_root: bool,
}

impl From<&ConfigSection> for DiscoveryOptions {
    fn from(section: &ConfigSection) -> Self {
        Self {
            manifest: section.manifest.clone(),
            cache_dir: section.cache_dir.clone(),
            include_root: section.include_root,
        }
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from(&ConfigSection::default())
    }
}

/// Walk `root` and return every manifest path.
///
/// Order is deterministic: within a directory its own manifest comes first,
/// then subdirectories in name order. Any unreadable directory aborts the
/// walk.
pub fn discover_manifests(
    fs: &dyn FileSystem,
    root: &Path,
    options: &DiscoveryOptions,
) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(fs, root, options, true, &mut found)?;
    debug!(root = ?root, count = found.len(), "manifest discovery finished");
    Ok(found)
}

fn walk(
    fs: &dyn FileSystem,
    dir: &Path,
    options: &DiscoveryOptions,
    is_root: bool,
    found: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut entries = fs
        .read_dir(dir)
        .with_context(|| format!("discovering units under {:?}", dir))?;
    entries.sort();

    let mut subdirs = Vec::new();
    for entry in entries {
        let Some(name) = entry.file_name() else {
            continue;
        };

        if fs.is_dir(&entry) {
            if name == OsStr::new(&options.cache_dir) {
                trace!(path = ?entry, "skipping dependency cache directory");
                continue;
            }
            subdirs.push(entry);
        } else if name == OsStr::new(&options.manifest) && (!is_root || options.include_root) {
            found.push(entry);
        }
    }

    for sub in subdirs {
        walk(fs, &sub, options, false, found)?;
    }

    Ok(())
}
