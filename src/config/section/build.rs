//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! command = ["./gradlew", "classes"]   # run before recompile restarts
//! release = ["./gradlew", "--stop"]    # run once on shutdown
//! ```
//!
//! An empty `command` disables compilation (the IDE does it).

use serde::Deserialize;

/// Build command settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Command that compiles the project.
    pub command: Vec<String>,

    /// Command releasing the build system (daemon stop etc.).
    pub release: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["gradle".into(), "classes".into()],
            release: Vec::new(),
        }
    }
}
