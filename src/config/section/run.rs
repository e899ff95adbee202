//! `[run]` section configuration.
//!
//! Contains settings for the managed application.
//!
//! # Example
//!
//! ```toml
//! [run]
//! main = "com.example.App"           # required unless discoverable
//! mode = "DEFAULT"                   # execution mode passed to the app
//! command = ["java", "-cp", "$HOTSWAP_CLASSPATH", "$HOTSWAP_MAIN"]
//! restart_extensions = ["conf", "properties", "class"]
//! compile_extensions = ["java", "kt"]
//! debounce_ms = 100
//! shutdown_hook = true               # stop cleanly on Ctrl+C / SIGTERM
//! ```

use serde::Deserialize;

use crate::config::ConfigDiagnostics;

/// Managed application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Main entry identifier.
    pub main: Option<String>,

    /// Execution mode.
    pub mode: String,

    /// Command launching one instance of the application.
    /// Supports `$HOTSWAP_*` variable substitution.
    pub command: Vec<String>,

    /// Changes to these extensions restart the application.
    pub restart_extensions: Vec<String>,

    /// Changes to these extensions rebuild, then restart.
    pub compile_extensions: Vec<String>,

    /// Quiet period before a burst of changes is dispatched.
    pub debounce_ms: u64,

    /// Install a termination signal handler while running.
    pub shutdown_hook: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            main: None,
            mode: "DEFAULT".into(),
            command: ["java", "-cp", "$HOTSWAP_CLASSPATH", "$HOTSWAP_MAIN"]
                .map(String::from)
                .to_vec(),
            restart_extensions: ["conf", "properties", "class"].map(String::from).to_vec(),
            compile_extensions: ["java", "kt"].map(String::from).to_vec(),
            debounce_ms: 100,
            shutdown_hook: true,
        }
    }
}

impl RunConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.command.is_empty() {
            diag.error_with_hint(
                "run.command",
                "must not be empty",
                "e.g. [\"java\", \"-cp\", \"$HOTSWAP_CLASSPATH\", \"$HOTSWAP_MAIN\"]",
            );
        }
        if self.mode.trim().is_empty() {
            diag.error("run.mode", "must not be empty");
        }
        for (field, list) in [
            ("run.restart_extensions", &self.restart_extensions),
            ("run.compile_extensions", &self.compile_extensions),
        ] {
            if list.iter().any(|e| e.is_empty() || e.starts_with('.')) {
                diag.error_with_hint(
                    field,
                    "extensions must be non-empty and must not start with a dot",
                    "use \"java\" instead of \".java\"",
                );
            }
        }
    }
}
