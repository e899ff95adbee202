//! App Supervisor
//!
//! Owns the managed application's lifecycle: the single live
//! [`ExecutionContext`], the watch registry feeding reloads, and the
//! termination hook.
//!
//! ```text
//!              ┌──────────── AppSupervisor ─────────────┐
//! fs change ──>│ WatchRegistry ──> ReloadCoordinator ───┼──> restart()
//! SIGINT ─────>│ signal hook ──────────────────────────-┼──> shutdown()
//!              └────────────────────────────────────────┘
//! ```
//!
//! Lock order: `lifecycle` before `registry`. `restart()` holds `lifecycle`
//! for the whole swap, so a concurrent `shutdown()` waits for it.

mod context;
mod error;
mod state;


use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::build::BuildTool;
use crate::core::signal::{self, HookId};
use crate::project::Classpath;
use crate::reload::{Classification, ExtensionRules, ReloadCoordinator, ReloadOutcome, ReloadTarget};
use crate::watch::{ChangeCallback, WatchRegistry};
use crate::{debug, log, logger};

pub use context::{ContextFactory, ExecutionContext, ProcessFactory, hotswap_vars};
pub use error::SupervisorError;
pub use state::SupervisorState;

/// Bounded wait for watcher tasks after the supervisor stopped.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings captured once at construction.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub main: String,
    pub mode: String,
    /// Register a termination hook while running.
    pub shutdown_hook: bool,
    pub debounce: Duration,
}

#[derive(Default)]
struct Lifecycle {
    state: SupervisorState,
    context: Option<Box<dyn ExecutionContext>>,
    classpath: Classpath,
    hook: Option<HookId>,
    /// Reason the last run ended fatally.
    fatal: Option<String>,
}

impl Lifecycle {
    fn set_state(&mut self, next: SupervisorState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        debug!("supervisor"; "{} -> {}", self.state, next);
        self.state = next;
    }

    fn expect_state(&self, op: &'static str, expected: SupervisorState) -> Result<(), SupervisorError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SupervisorError::InvalidState {
                op,
                state: self.state,
            })
        }
    }
}

struct Shared {
    me: Weak<Shared>,
    settings: SupervisorSettings,
    lifecycle: Mutex<Lifecycle>,
    /// Signalled when the state reaches `Stopped`.
    stopped: Condvar,
    registry: Mutex<WatchRegistry>,
    coordinator: ReloadCoordinator,
    factory: Box<dyn ContextFactory>,
    build: Arc<dyn BuildTool>,
}

/// Handle to the supervisor. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct AppSupervisor {
    shared: Arc<Shared>,
}

impl AppSupervisor {
    pub fn new(
        settings: SupervisorSettings,
        factory: Box<dyn ContextFactory>,
        build: Arc<dyn BuildTool>,
    ) -> Self {
        let shared = Arc::new_cyclic(|me: &Weak<Shared>| {
            let target: Weak<dyn ReloadTarget> = me.clone();
            Shared {
                me: me.clone(),
                registry: Mutex::new(WatchRegistry::new(settings.debounce)),
                coordinator: ReloadCoordinator::new(build.clone(), target),
                settings,
                lifecycle: Mutex::new(Lifecycle::default()),
                stopped: Condvar::new(),
                factory,
                build,
            }
        });
        Self { shared }
    }

    pub fn state(&self) -> SupervisorState {
        self.shared.lifecycle.lock().state
    }

    pub fn classpath(&self) -> Classpath {
        self.shared.lifecycle.lock().classpath.clone()
    }

    pub fn add_resource(&self, path: impl Into<PathBuf>) -> Result<(), SupervisorError> {
        let mut life = self.shared.lifecycle.lock();
        life.expect_state("add a resource", SupervisorState::Stopped)?;
        life.classpath.add_resource(path);
        Ok(())
    }

    pub fn add_dependency(&self, path: impl Into<PathBuf>) -> Result<(), SupervisorError> {
        let mut life = self.shared.lifecycle.lock();
        life.expect_state("add a dependency", SupervisorState::Stopped)?;
        life.classpath.add_dependency(path);
        Ok(())
    }

    /// Compiled-output directory; on the classpath whenever it exists.
    pub fn add_binary_directory(&self, path: impl Into<PathBuf>) -> Result<(), SupervisorError> {
        let mut life = self.shared.lifecycle.lock();
        life.expect_state("add a binary directory", SupervisorState::Stopped)?;
        life.classpath.add_binary_directory(path);
        Ok(())
    }

    pub fn add_watch(
        &self,
        path: impl Into<PathBuf>,
        on_change: ChangeCallback,
    ) -> Result<(), SupervisorError> {
        let life = self.shared.lifecycle.lock();
        life.expect_state("add a watch", SupervisorState::Stopped)?;
        self.shared.registry.lock().add_root(path, on_change)?;
        Ok(())
    }

    /// Callback that classifies each change and feeds the coordinator.
    ///
    /// Returns as soon as the change is admitted or merged; the reload itself
    /// runs on the blocking pool so the root's later changes reach the
    /// coordinator while it is in flight.
    pub fn change_handler(&self, rules: ExtensionRules) -> ChangeCallback {
        let weak = Arc::downgrade(&self.shared);
        Arc::new(move |event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let classification = rules.classify(&event.path);
            let Ok(ticket) = shared.coordinator.admit(classification, &event.path) else {
                return;
            };
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(move || shared.coordinator.run(ticket));
                }
                Err(_) => {
                    shared.coordinator.run(ticket);
                }
            }
        })
    }

    /// Ask for a reload as if `path` had changed.
    pub fn request_reload(&self, classification: Classification, path: &Path) -> ReloadOutcome {
        self.shared.coordinator.request_reload(classification, path)
    }

    /// Start the application and block until the supervisor stops.
    ///
    /// Returns `Err` if the initial instance could not be created or a
    /// later failure forced a fatal shutdown.
    pub fn start(&self) -> Result<(), SupervisorError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("hotswap-watch")
            .enable_all()
            .build()
            .map_err(SupervisorError::Runtime)?;

        let fatal = {
            let shared = &self.shared;
            let mut life = shared.lifecycle.lock();
            life.expect_state("start", SupervisorState::Stopped)?;
            life.fatal = None;
            life.set_state(SupervisorState::Starting);
            shared.coordinator.open();
            life.classpath.refresh_binaries();

            let roots = match shared.launch(&mut life, runtime.handle()) {
                Ok(roots) => roots,
                Err(e) => {
                    if let Some(mut context) = life.context.take() {
                        context.destroy();
                    }
                    life.set_state(SupervisorState::Stopped);
                    shared.stopped.notify_all();
                    return Err(e);
                }
            };

            life.set_state(SupervisorState::Running);
            log!(
                "supervisor";
                "running {} ({} mode), watching {} root(s)",
                shared.settings.main,
                shared.settings.mode,
                roots
            );

            while life.state != SupervisorState::Stopped {
                shared.stopped.wait(&mut life);
            }
            life.fatal.take()
        };

        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        match fatal {
            Some(reason) => Err(SupervisorError::Fatal(reason)),
            None => Ok(()),
        }
    }

    /// Replace the running instance with a fresh one.
    pub fn restart(&self) -> Result<(), SupervisorError> {
        self.shared.restart()
    }

    /// Stop everything. Returns `true` only for the call that did the
    /// teardown; later calls are no-ops.
    pub fn shutdown(&self) -> bool {
        self.shared.shutdown()
    }
}

impl Shared {
    /// Create the first context, start watching, register the hook.
    ///
    /// Returns the number of watch roots.
    fn launch(
        &self,
        life: &mut Lifecycle,
        handle: &tokio::runtime::Handle,
    ) -> Result<usize, SupervisorError> {
        life.context = Some(self.factory.create(&life.classpath, &self.settings.mode)?);
        let roots = {
            let mut registry = self.registry.lock();
            registry.start(handle)?;
            registry.roots().count()
        };

        if self.settings.shutdown_hook {
            let me = self.me.clone();
            let hook = signal::register(move || {
                if let Some(shared) = me.upgrade() {
                    log!("supervisor"; "termination requested");
                    shared.shutdown();
                }
            });
            match hook {
                Ok(id) => life.hook = Some(id),
                Err(e) => {
                    self.registry.lock().stop();
                    return Err(e.into());
                }
            }
        }
        Ok(roots)
    }

    fn restart(&self) -> Result<(), SupervisorError> {
        let mut life = self.lifecycle.lock();
        life.expect_state("restart", SupervisorState::Running)?;
        life.set_state(SupervisorState::Restarting);

        if life.classpath.refresh_binaries() {
            debug!("supervisor"; "binary directories changed since last start");
        }

        if let Err(e) = self.factory.check(&life.classpath, &self.settings.mode) {
            let alive = life.context.as_mut().is_some_and(|c| c.is_alive());
            if alive {
                logger::status_warning(&format!("keeping current instance: {e}"));
                life.set_state(SupervisorState::Running);
                return Err(e.into());
            }
            return Err(self.escalate(&mut life, e.to_string()));
        }

        if let Some(mut old) = life.context.take() {
            old.destroy();
        }

        match self.factory.create(&life.classpath, &self.settings.mode) {
            Ok(context) => {
                life.context = Some(context);
                life.set_state(SupervisorState::Running);
                Ok(())
            }
            Err(e) => Err(self.escalate(&mut life, e.to_string())),
        }
    }

    /// Record a fatal failure and shut down from another thread.
    ///
    /// Runs with `lifecycle` held, possibly on the thread owning the
    /// in-flight reload, which `shutdown()` waits for.
    fn escalate(&self, life: &mut Lifecycle, reason: String) -> SupervisorError {
        log!("error"; "no live instance left: {}", reason);
        life.fatal = Some(reason.clone());
        if let Some(shared) = self.me.upgrade() {
            std::thread::spawn(move || shared.shutdown());
        }
        SupervisorError::Fatal(reason)
    }

    fn shutdown(&self) -> bool {
        let hook = {
            let mut life = self.lifecycle.lock();
            if life.state.is_stopping() {
                return false;
            }
            life.set_state(SupervisorState::ShuttingDown);
            life.hook.take()
        };
        log!("supervisor"; "shutting down...");

        // Finish or drop the in-flight reload before tearing anything down.
        self.coordinator.close();
        if let Some(id) = hook {
            signal::deregister(id);
        }
        self.registry.lock().stop();

        let mut life = self.lifecycle.lock();
        if let Some(mut context) = life.context.take() {
            context.destroy();
        }
        self.build.release();
        life.set_state(SupervisorState::Stopped);
        self.stopped.notify_all();
        true
    }
}

impl ReloadTarget for Shared {
    fn restart(&self) -> Result<(), SupervisorError> {
        Shared::restart(self)
    }
}
