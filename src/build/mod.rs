//! Build collaborator.
//!
//! The supervisor never compiles anything itself. It asks a [`BuildTool`]
//! to do so and only looks at success or failure; the tool streams its own
//! diagnostics to our stdout/stderr.

use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::utils::exec::{Cmd, resolve_args};
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed: {status}")]
    Failed { command: String, status: String },
}

/// External component that compiles sources.
pub trait BuildTool: Send + Sync {
    /// Run the build synchronously.
    fn build(&self) -> Result<(), BuildError>;

    /// Release any connection held to the build system.
    fn release(&self) {}
}

/// Build tool that runs a configured command in the project root.
///
/// An empty command means there is nothing to compile (e.g. an IDE
/// compiles for us) and every build succeeds.
#[derive(Debug, Clone)]
pub struct CommandBuild {
    command: Vec<String>,
    release: Vec<String>,
    root: PathBuf,
    vars: FxHashMap<String, String>,
}

impl CommandBuild {
    pub fn new(command: Vec<String>, root: &Path) -> Self {
        Self {
            command,
            release: Vec::new(),
            root: root.to_path_buf(),
            vars: FxHashMap::default(),
        }
    }

    /// Command run once when the supervisor shuts down (e.g. `gradle --stop`).
    pub fn with_release(mut self, release: Vec<String>) -> Self {
        self.release = release;
        self
    }

    /// `$NAME` variables substituted into both commands and exported to them.
    pub fn with_vars(mut self, vars: FxHashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    fn cmd(&self, args: &[String]) -> Cmd {
        Cmd::from_slice(&resolve_args(args, &self.vars))
            .cwd(&self.root)
            .envs(&self.vars)
    }
}

impl BuildTool for CommandBuild {
    fn build(&self) -> Result<(), BuildError> {
        if self.command.is_empty() {
            debug!("build"; "no build command configured, skipping");
            return Ok(());
        }

        let cmd = self.cmd(&self.command);
        let command = cmd.display();
        debug!("build"; "running `{}`", command);

        let status = cmd.status().map_err(|source| BuildError::Spawn {
            command: command.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::Failed {
                command,
                status: status.to_string(),
            })
        }
    }

    fn release(&self) {
        if self.release.is_empty() {
            return;
        }
        let cmd = self.cmd(&self.release);
        match cmd.status() {
            Ok(status) if status.success() => debug!("build"; "released `{}`", cmd.display()),
            Ok(status) => log!("build"; "`{}` exited with {}", cmd.display(), status),
            Err(e) => log!("build"; "failed to run `{}`: {}", cmd.display(), e),
        }
    }
}
