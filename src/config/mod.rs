//! Project configuration management for `hotswap.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── project    # [project]
//! │   ├── run        # [run]
//! │   └── build      # [build]
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # Config file discovery
//! └── mod.rs         # HotswapConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | `[project]` | Resource, source, classpath and library locations    |
//! | `[run]`     | Main entry, mode, launch command, change extensions  |
//! | `[build]`   | Build command run before recompile restarts          |
//!
//! The file is optional: without one, defaults apply and the project root
//! is the current directory.

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{BuildConfig, ProjectConfig, RunConfig};

use util::find_config_file;

use crate::{
    cli::{Cli, RunArgs},
    debug, log,
    utils::path::{normalize_path, resolve_under},
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing hotswap.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotswapConfig {
    /// Absolute path to the config file, empty when none was found (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,

    /// Managed application settings
    #[serde(default)]
    pub run: RunConfig,

    /// Build command settings
    #[serde(default)]
    pub build: BuildConfig,
}

impl HotswapConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file. The project root is
    /// the config file's parent directory, or cwd when there is no file.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "no {} found, using defaults", cli.config.display());
                Self {
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        config.finalize(cli.run_args());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) =
            Self::parse_with_ignored(&content).map_err(ConfigError::Toml)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), toml::de::Error> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Resolve paths against the root and apply CLI overrides.
    fn finalize(&mut self, args: &RunArgs) {
        let root = normalize_path(&self.root);
        self.root = root.clone();
        self.normalize_paths(&root);
        self.apply_run_args(args);
    }

    fn normalize_paths(&mut self, root: &Path) {
        let project = &mut self.project;
        for list in [
            &mut project.resources,
            &mut project.sources,
            &mut project.classpath,
            &mut project.provided,
            &mut project.libs,
        ] {
            for path in list.iter_mut() {
                *path = resolve_under(root, path);
            }
        }
        project.conf = resolve_under(root, &project.conf);
        project.marker = resolve_under(root, &project.marker);
    }

    fn apply_run_args(&mut self, args: &RunArgs) {
        if args.main.is_some() {
            self.run.main.clone_from(&args.main);
        }
        Self::update_option(&mut self.run.mode, args.mode.as_ref());
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Main entry explicitly configured (`--main` or `[run] main`), if any.
    pub fn explicit_main(&self) -> Option<&str> {
        self.run.main.as_deref().filter(|m| !m.trim().is_empty())
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.project.validate(&mut diag);
        self.run.validate(&mut diag);

        Ok(diag.into_result()?)
    }
}

// ============================================================================
// test helpers
// ============================================================================

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> HotswapConfig {
    let (parsed, ignored) = HotswapConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
