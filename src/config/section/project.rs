//! `[project]` section configuration.
//!
//! Describes where things live in the project. Relative paths are resolved
//! against the project root (the directory holding `hotswap.toml`).
//!
//! # Example
//!
//! ```toml
//! [project]
//! main = "com.example.App"
//! resources = ["src/main/resources"]
//! sources = ["src/main/java", "src/main/kotlin"]
//! classpath = ["build/classes/java/main", "build/resources/main"]
//! provided = ["lib/servlet-api.jar"]
//! libs = ["lib"]
//! conf = "conf"
//! marker = ".classpath"
//! archive_extensions = ["jar"]
//! ```

use serde::Deserialize;
use std::path::PathBuf;

use crate::config::ConfigDiagnostics;

/// Project layout settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Main entry discovered from the project description.
    /// `[run] main` takes precedence.
    pub main: Option<String>,

    /// Resource directories (watched and put on the classpath).
    pub resources: Vec<PathBuf>,

    /// Source directories (watched unless an external compiler is detected).
    pub sources: Vec<PathBuf>,

    /// Runtime classpath: compiled-output directories and archives.
    pub classpath: Vec<PathBuf>,

    /// Extra classpath entries provided by the environment.
    pub provided: Vec<PathBuf>,

    /// Directories scanned for dependency archives.
    pub libs: Vec<PathBuf>,

    /// Conventional configuration directory, always watched.
    pub conf: PathBuf,

    /// Marker file signalling that an IDE compiles the project.
    pub marker: PathBuf,

    /// File extensions counted as dependency archives.
    pub archive_extensions: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            main: None,
            resources: vec!["src/main/resources".into()],
            sources: vec!["src/main/java".into(), "src/main/kotlin".into()],
            classpath: vec![
                "build/classes/java/main".into(),
                "build/classes/kotlin/main".into(),
                "build/resources/main".into(),
            ],
            provided: Vec::new(),
            libs: Vec::new(),
            conf: "conf".into(),
            marker: ".classpath".into(),
            archive_extensions: vec!["jar".into()],
        }
    }
}

impl ProjectConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.conf.as_os_str().is_empty() {
            diag.error("project.conf", "must not be empty");
        }
        if self.archive_extensions.iter().any(|e| e.starts_with('.')) {
            diag.error_with_hint(
                "project.archive_extensions",
                "extensions must not start with a dot",
                "use \"jar\" instead of \".jar\"",
            );
        }
    }
}
