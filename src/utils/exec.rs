//! External command execution utilities.
//!
//! Provides a Builder-based API for running the build command and the
//! managed application. Both inherit the supervisor's standard streams so
//! compiler diagnostics and application logs show up in the same terminal.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Blocking run, output streamed to our stdout/stderr
//! let status = Cmd::from_slice(&["gradle", "classes"]).cwd(root).status()?;
//!
//! // Long-running child
//! let child = Cmd::from_slice(&args).cwd(root).envs(&vars).spawn()?;
//! ```

use rustc_hash::FxHashMap;
use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
};

/// Command builder for external process execution.
#[derive(Debug, Default, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl Cmd {
    /// Create from a command array (e.g., `["gradle", "classes"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Program name for messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Full command line for messages.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(self.envs.iter().cloned());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run to completion with inherited stdio.
    pub fn status(&self) -> io::Result<ExitStatus> {
        self.command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
    }

    /// Spawn without waiting, with inherited stdout/stderr.
    pub fn spawn(&self) -> io::Result<Child> {
        self.command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
    }
}

/// Resolve `$NAME` variables in command arguments.
///
/// Longer names are substituted first so `$HOTSWAP_MAIN` never eats the
/// prefix of a longer variable.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<_> = vars.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for key in &keys {
                let pattern = format!("${key}");
                result = result.replace(&pattern, &vars[*key]);
            }
            result
        })
        .collect()
}
