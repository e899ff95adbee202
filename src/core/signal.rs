//! Termination signal hook.
//!
//! A single process-wide handler for Ctrl+C / SIGTERM is installed on first
//! registration. At most one action is registered at a time, and it fires
//! at most once: the handler swaps it out before running it.
//!
//! ```text
//! SIGINT/SIGTERM ──> handler ──> HOOK.swap(None) ──> action()
//!                                    │
//!                                    └─ empty or repeated: exit immediately
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, OnceLock};

use arc_swap::ArcSwapOption;
use thiserror::Error;

/// Handler installation failed.
#[derive(Debug, Clone, Error)]
#[error("failed to install termination handler: {0}")]
pub struct SignalError(String);

/// Identifies one registration, so a stale owner cannot remove a newer hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookId(u64);

struct Registration {
    id: HookId,
    action: Box<dyn Fn() + Send + Sync>,
}

static HOOK: LazyLock<ArcSwapOption<Registration>> = LazyLock::new(ArcSwapOption::empty);
static INSTALLED: OnceLock<Result<(), String>> = OnceLock::new();
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Termination was requested since the current action was registered.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn install() -> Result<(), SignalError> {
    INSTALLED
        .get_or_init(|| {
            ctrlc::set_handler(|| {
                if !on_signal() {
                    std::process::exit(0);
                }
            })
            .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(SignalError)
}

/// Handle one termination signal. Returns `false` when the process should
/// exit right away: nothing is registered, or a second signal arrived while
/// the action is still running.
fn on_signal() -> bool {
    if SHUTDOWN.swap(true, Ordering::SeqCst) {
        return false;
    }
    fire()
}

/// Register `action` to run on the next termination signal.
///
/// Replaces any previously registered action and re-arms the graceful path.
pub fn register<F>(action: F) -> Result<HookId, SignalError>
where
    F: Fn() + Send + Sync + 'static,
{
    install()?;
    let id = HookId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    HOOK.store(Some(Arc::new(Registration {
        id,
        action: Box::new(action),
    })));
    SHUTDOWN.store(false, Ordering::SeqCst);
    Ok(id)
}

/// Remove the action registered under `id`. No-op if it already fired or
/// was replaced.
pub fn deregister(id: HookId) {
    HOOK.rcu(|current| match current {
        Some(registration) if registration.id == id => None,
        other => other.clone(),
    });
}

/// Run the registered action, if any. Returns whether one ran.
fn fire() -> bool {
    match HOOK.swap(None) {
        Some(registration) => {
            (registration.action)();
            true
        }
        None => false,
    }
}
