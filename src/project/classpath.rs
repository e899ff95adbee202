//! Classpath Collection
//!
//! Derives, from a `BuildModel`, everything the supervisor needs before it
//! starts: the main entry, the classpath and the directories to watch.
//!
//! ```text
//! resources + conf ──────────────┐
//! runtime/provided dirs ─────────┼──> Classpath   (resources, binaries, deps)
//! runtime/provided archives ─────┤
//! library dir listings ──────────┘
//!
//! resources + conf + sources ────────> watch roots
//!   (sources replaced by binaries when the IDE marker file exists)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use super::model::BuildModel;
use crate::config::{ConfigError, HotswapConfig};
use crate::debug;
use crate::utils::path::resolve_under;

/// Role of a classpath entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Resource,
    BinaryDirectory,
    Dependency,
}

impl EntryKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::BinaryDirectory => "binary",
            Self::Dependency => "dependency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Insertion-ordered, duplicate-free classpath.
///
/// Binary directories are kept as candidates so a restart can re-check which
/// of them exist now.
#[derive(Debug, Clone, Default)]
pub struct Classpath {
    resources: Vec<PathBuf>,
    binaries: Vec<PathBuf>,
    dependencies: Vec<PathBuf>,
    binary_candidates: Vec<PathBuf>,
    seen: FxHashSet<PathBuf>,
}

impl Classpath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource directory (need not exist).
    pub fn add_resource(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        self.seen.insert(path.clone()) && {
            self.resources.push(path);
            true
        }
    }

    /// Append a dependency archive.
    pub fn add_dependency(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        self.seen.insert(path.clone()) && {
            self.dependencies.push(path);
            true
        }
    }

    /// Register a compiled-output directory. It joins the classpath only
    /// while it exists.
    pub fn add_binary_directory(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.binary_candidates.contains(&path) || self.seen.contains(&path) {
            return false;
        }
        self.binary_candidates.push(path.clone());
        if is_existing_dir(&path) {
            self.seen.insert(path.clone());
            self.binaries.push(path);
        }
        true
    }

    /// Recompute which binary directories exist. Returns whether the set changed.
    pub fn refresh_binaries(&mut self) -> bool {
        let current: Vec<PathBuf> = self
            .binary_candidates
            .iter()
            .filter(|p| is_existing_dir(p))
            .cloned()
            .collect();
        if current == self.binaries {
            return false;
        }

        for old in &self.binaries {
            self.seen.remove(old);
        }
        self.seen.extend(current.iter().cloned());
        debug!("supervisor"; "binary directories: {} -> {}", self.binaries.len(), current.len());
        self.binaries = current;
        true
    }

    /// All entries: resources, then binary directories, then dependencies.
    pub fn entries(&self) -> impl Iterator<Item = ClasspathEntry> + '_ {
        let tagged = |kind| move |path: &PathBuf| ClasspathEntry {
            path: path.clone(),
            kind,
        };
        self.resources
            .iter()
            .map(tagged(EntryKind::Resource))
            .chain(self.binaries.iter().map(tagged(EntryKind::BinaryDirectory)))
            .chain(self.dependencies.iter().map(tagged(EntryKind::Dependency)))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.resources
            .iter()
            .chain(&self.binaries)
            .chain(&self.dependencies)
            .map(PathBuf::as_path)
    }

    pub fn binaries(&self) -> &[PathBuf] {
        &self.binaries
    }

    /// Every registered binary directory, existing or not.
    pub fn binary_candidates(&self) -> &[PathBuf] {
        &self.binary_candidates
    }

}

fn is_existing_dir(path: &Path) -> bool {
    path.is_dir()
}

/// Filesystem conventions applied on top of the build model.
#[derive(Debug, Clone)]
pub struct Conventions {
    /// Configuration directory, always on the classpath and watched.
    pub conf: PathBuf,
    /// Marker whose presence means an IDE compiles the project.
    pub marker: PathBuf,
    /// File extensions of dependency archives.
    pub archive_extensions: Vec<String>,
}

impl Conventions {
    pub fn from_config(config: &HotswapConfig) -> Self {
        Self {
            conf: config.project.conf.clone(),
            marker: config.project.marker.clone(),
            archive_extensions: config.project.archive_extensions.clone(),
        }
    }

    fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.archive_extensions.iter().any(|a| a == ext))
    }
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            conf: "conf".into(),
            marker: ".classpath".into(),
            archive_extensions: vec!["jar".into()],
        }
    }
}

/// Everything collected before `start()`.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub main: String,
    pub classpath: Classpath,
    /// Source directories; empty when an external compiler is detected.
    pub sources: Vec<PathBuf>,
    pub watch_roots: Vec<PathBuf>,
}

impl ProjectLayout {
    /// Whether sources are compiled by someone else (marker file present).
    pub fn external_compiler(&self) -> bool {
        self.sources.is_empty()
    }
}

pub struct ClasspathCollector;

impl ClasspathCollector {
    /// Collect the project layout.
    ///
    /// Fails with `MainEntryNotFound` when neither `explicit_main` nor the
    /// model provides a main entry.
    pub fn collect(
        model: &dyn BuildModel,
        explicit_main: Option<&str>,
        conventions: &Conventions,
    ) -> Result<ProjectLayout, ConfigError> {
        let main = explicit_main
            .map(str::to_owned)
            .or_else(|| model.main_entry())
            .filter(|m| !m.trim().is_empty())
            .ok_or(ConfigError::MainEntryNotFound)?;

        let project_dir = model.project_dir();
        let mut classpath = Classpath::new();
        let mut watch_roots = Vec::new();

        for dir in model.resource_dirs() {
            classpath.add_resource(&dir);
            push_unique(&mut watch_roots, dir);
        }

        let conf = resolve_under(project_dir, &conventions.conf);
        classpath.add_resource(&conf);
        push_unique(&mut watch_roots, conf);

        let declared: Vec<PathBuf> = model
            .runtime_classpath()
            .into_iter()
            .chain(model.provided_classpath())
            .collect();

        for path in &declared {
            if is_existing_dir(path) {
                classpath.add_binary_directory(path);
            } else if path.is_file() && conventions.is_archive(path) {
                classpath.add_dependency(path);
            } else if !path.exists() && !conventions.is_archive(path) {
                // Output directory not built yet; picked up on restart.
                classpath.add_binary_directory(path);
            }
        }

        for dir in model.library_dirs() {
            for archive in list_archives(&dir, conventions) {
                classpath.add_dependency(archive);
            }
        }

        let marker = resolve_under(project_dir, &conventions.marker);
        let sources = if marker.exists() {
            debug!("supervisor"; "{} found, compiler is off in favor of the IDE", marker.display());
            for dir in classpath.binary_candidates() {
                push_unique(&mut watch_roots, dir.clone());
            }
            Vec::new()
        } else {
            let sources: Vec<PathBuf> = dedup(model.source_dirs());
            for dir in &sources {
                push_unique(&mut watch_roots, dir.clone());
            }
            sources
        };

        Ok(ProjectLayout {
            main,
            classpath,
            sources,
            watch_roots,
        })
    }
}

/// Archives directly inside `dir`, sorted by name. A missing directory is empty.
fn list_archives(dir: &Path, conventions: &Conventions) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        debug!("supervisor"; "library directory not readable: {}", dir.display());
        return Vec::new();
    };
    let mut archives: Vec<PathBuf> = read_dir
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && conventions.is_archive(p))
        .collect();
    archives.sort();
    archives
}

fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}

fn dedup(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        push_unique(&mut out, path);
    }
    out
}
