#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use monorun::fs::mock::MockFileSystem;
use monorun::registry::{DiscoveryOptions, UnitRegistry};

/// Builder for a `package.json` document.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    name: String,
    version: String,
    scripts: BTreeMap<String, String>,
    dependencies: BTreeMap<String, String>,
    dev_dependencies: BTreeMap<String, String>,
}

impl ManifestBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            scripts: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn script(mut self, name: &str, cmd: &str) -> Self {
        self.scripts.insert(name.to_string(), cmd.to_string());
        self
    }

    pub fn dependency(mut self, name: &str, requirement: &str) -> Self {
        self.dependencies
            .insert(name.to_string(), requirement.to_string());
        self
    }

    pub fn dev_dependency(mut self, name: &str, requirement: &str) -> Self {
        self.dev_dependencies
            .insert(name.to_string(), requirement.to_string());
        self
    }

    pub fn to_json(&self) -> String {
        fn map(entries: &BTreeMap<String, String>) -> Value {
            Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<String, Value>>(),
            )
        }

        let doc = json!({
            "name": self.name,
            "version": self.version,
            "private": true,
            "scripts": map(&self.scripts),
            "dependencies": map(&self.dependencies),
            "devDependencies": map(&self.dev_dependencies),
        });
        serde_json::to_string_pretty(&doc).expect("manifest serializes")
    }
}

/// Builds a monorepo layout inside a `MockFileSystem` rooted at `.`.
pub struct WorkspaceBuilder {
    fs: MockFileSystem,
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
        }
    }

    /// Add a unit whose manifest lives in `./<dir>/package.json`.
    pub fn unit(self, dir: &str, manifest: ManifestBuilder) -> Self {
        let path = Self::path(dir).join("package.json");
        self.fs.add_file(path, manifest.to_json());
        self
    }

    pub fn file(self, path: &str, contents: &str) -> Self {
        self.fs.add_file(Self::path(path), contents);
        self
    }

    pub fn path(relative: &str) -> PathBuf {
        Path::new(".").join(relative)
    }

    pub fn build(self) -> MockFileSystem {
        self.fs
    }

    /// Build and discover with default options.
    pub fn registry(self) -> (MockFileSystem, UnitRegistry) {
        let fs = self.build();
        let registry = UnitRegistry::discover(&fs, Path::new("."), &DiscoveryOptions::default())
            .expect("discovery succeeds");
        (fs, registry)
    }
}

impl Default for WorkspaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
