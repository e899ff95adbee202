//! Execution contexts: one running instance of the managed application.
//!
//! The supervisor only ever holds a `Box<dyn ExecutionContext>` and builds
//! new ones through a [`ContextFactory`]. The default factory runs the
//! application as a child process.

use std::env::{self, JoinPathsError};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Child;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::project::Classpath;
use crate::utils::exec::{Cmd, resolve_args};
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("run command is empty")]
    EmptyCommand,

    #[error("main entry is empty")]
    MissingMain,

    #[error("`{program}` not found")]
    ProgramNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("classpath entry cannot be joined into a path list")]
    Classpath(#[from] JoinPathsError),

    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// One live instance of the managed application.
pub trait ExecutionContext: Send {
    /// Tear the instance down. Must be idempotent.
    fn destroy(&mut self);

    /// Whether the instance is still running.
    fn is_alive(&mut self) -> bool;
}

/// Creates execution contexts from a classpath and an execution mode.
pub trait ContextFactory: Send + Sync {
    /// Cheap preflight run before the old instance is torn down on restart.
    fn check(&self, _classpath: &Classpath, _mode: &str) -> Result<(), ContextError> {
        Ok(())
    }

    fn create(&self, classpath: &Classpath, mode: &str) -> Result<Box<dyn ExecutionContext>, ContextError>;
}

/// `$HOTSWAP_*` variables for commands run on behalf of the project.
pub fn hotswap_vars(
    root: &Path,
    main: &str,
    mode: &str,
    classpath: &Classpath,
) -> Result<FxHashMap<String, String>, ContextError> {
    let joined = env::join_paths(classpath.paths())?;

    let mut vars = FxHashMap::default();
    vars.insert("HOTSWAP_ROOT".into(), root.to_string_lossy().into_owned());
    vars.insert("HOTSWAP_MAIN".into(), main.to_owned());
    vars.insert("HOTSWAP_MODE".into(), mode.to_owned());
    vars.insert("HOTSWAP_CLASSPATH".into(), joined.to_string_lossy().into_owned());
    Ok(vars)
}

/// Factory that runs `[run] command` as a child process.
#[derive(Debug, Clone)]
pub struct ProcessFactory {
    command: Vec<String>,
    root: PathBuf,
    main: String,
}

impl ProcessFactory {
    pub fn new(command: Vec<String>, root: &Path, main: impl Into<String>) -> Self {
        Self {
            command,
            root: root.to_path_buf(),
            main: main.into(),
        }
    }

    fn cmd(&self, classpath: &Classpath, mode: &str) -> Result<Cmd, ContextError> {
        if self.command.is_empty() {
            return Err(ContextError::EmptyCommand);
        }
        let vars = hotswap_vars(&self.root, &self.main, mode, classpath)?;
        Ok(Cmd::from_slice(&resolve_args(&self.command, &vars))
            .cwd(&self.root)
            .envs(&vars))
    }
}

impl ContextFactory for ProcessFactory {
    fn check(&self, classpath: &Classpath, mode: &str) -> Result<(), ContextError> {
        if self.main.trim().is_empty() {
            return Err(ContextError::MissingMain);
        }
        let program = self.cmd(classpath, mode)?.program_name();
        which::which_in(&program, env::var_os("PATH"), &self.root)
            .map(|_| ())
            .map_err(|source| ContextError::ProgramNotFound { program, source })
    }

    fn create(&self, classpath: &Classpath, mode: &str) -> Result<Box<dyn ExecutionContext>, ContextError> {
        let cmd = self.cmd(classpath, mode)?;
        let command = cmd.display();
        debug!("run"; "spawning `{}`", command);

        let child = cmd
            .spawn()
            .map_err(|source| ContextError::Spawn { command, source })?;
        debug!("run"; "started pid {}", child.id());

        Ok(Box::new(ProcessContext { child: Some(child) }))
    }
}

/// Child-process execution context.
#[derive(Debug)]
pub struct ProcessContext {
    child: Option<Child>,
}

impl ExecutionContext for ProcessContext {
    fn destroy(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        if let Ok(None) = child.try_wait()
            && let Err(e) = child.kill()
        {
            log!("run"; "failed to stop pid {}: {}", pid, e);
        }
        match child.wait() {
            Ok(status) => debug!("run"; "pid {} exited: {}", pid, status),
            Err(e) => log!("run"; "failed to reap pid {}: {}", pid, e),
        }
    }

    fn is_alive(&mut self) -> bool {
        self.child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)))
    }
}

impl Drop for ProcessContext {
    fn drop(&mut self) {
        self.destroy();
    }
}
