//! Build model: where a project keeps its resources, sources and outputs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::utils::path::resolve_under;

/// Properties file consulted for `mainClassName` when no main is configured.
const GRADLE_PROPERTIES: &str = "gradle.properties";

/// Read-only view of a project's build layout.
pub trait BuildModel {
    fn project_dir(&self) -> &Path;
    /// Main entry the build declares, if any.
    fn main_entry(&self) -> Option<String>;
    fn resource_dirs(&self) -> Vec<PathBuf>;
    /// Compiled-output directories and archives, in classpath order.
    fn runtime_classpath(&self) -> Vec<PathBuf>;
    /// Entries supplied by the runtime environment.
    fn provided_classpath(&self) -> Vec<PathBuf>;
    fn source_dirs(&self) -> Vec<PathBuf>;
    /// Directories whose archives are dependencies.
    fn library_dirs(&self) -> Vec<PathBuf>;
}

/// `BuildModel` over the `[project]` section of `hotswap.toml`.
#[derive(Debug, Clone)]
pub struct ManifestModel {
    root: PathBuf,
    project: ProjectConfig,
}

impl ManifestModel {
    pub fn new(root: impl Into<PathBuf>, project: ProjectConfig) -> Self {
        Self {
            root: root.into(),
            project,
        }
    }

    fn resolve(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().map(|p| resolve_under(&self.root, p)).collect()
    }
}

impl BuildModel for ManifestModel {
    fn project_dir(&self) -> &Path {
        &self.root
    }

    fn main_entry(&self) -> Option<String> {
        self.project
            .main
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| read_property(&self.root.join(GRADLE_PROPERTIES), "mainClassName"))
    }

    fn resource_dirs(&self) -> Vec<PathBuf> {
        self.resolve(&self.project.resources)
    }

    fn runtime_classpath(&self) -> Vec<PathBuf> {
        self.resolve(&self.project.classpath)
    }

    fn provided_classpath(&self) -> Vec<PathBuf> {
        self.resolve(&self.project.provided)
    }

    fn source_dirs(&self) -> Vec<PathBuf> {
        self.resolve(&self.project.sources)
    }

    fn library_dirs(&self) -> Vec<PathBuf> {
        self.resolve(&self.project.libs)
    }
}

/// Look up `key` in a `key=value` / `key: value` properties file.
fn read_property(path: &Path, key: &str) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    content.lines().find_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            return None;
        }
        let (name, value) = line.split_once(['=', ':'])?;
        (name.trim() == key)
            .then(|| value.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}
