//! Watch Registry
//!
//! Owns one filesystem watch per registered root and delivers debounced
//! change events to that root's callback.
//!
//! Architecture (per root):
//! ```text
//! notify ──> collector task ──> dispatcher task ──> spawn_blocking(callback)
//!            (debounce, dedup,    (one event at a time,
//!             root maintenance)    in observed order)
//! ```
//!
//! Roots run independently: a slow callback or a vanished directory in one
//! root never stalls another.

mod debouncer;
mod root;
mod types;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use debouncer::Debouncer;
use root::{RootStatus, RootWatch};

pub use types::{ChangeCallback, ChangeEvent};

/// How often roots are checked for appearing or vanishing.
const MAINTAIN_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch registry is already active")]
    AlreadyActive,

    #[error("failed to watch `{}`", path.display())]
    Attach {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

struct WatchRoot {
    path: PathBuf,
    on_change: ChangeCallback,
}

/// Set of watch roots and their dispatch tasks.
pub struct WatchRegistry {
    roots: Vec<WatchRoot>,
    debounce: Duration,
    active: Arc<AtomicBool>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl WatchRegistry {
    pub fn new(debounce: Duration) -> Self {
        Self {
            roots: Vec::new(),
            debounce,
            active: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
        }
    }

    /// Register a directory (and its subtree). Only valid while stopped.
    pub fn add_root(
        &mut self,
        path: impl Into<PathBuf>,
        on_change: ChangeCallback,
    ) -> Result<(), WatchError> {
        if self.is_active() {
            return Err(WatchError::AlreadyActive);
        }
        self.roots.push(WatchRoot {
            path: path.into(),
            on_change,
        });
        Ok(())
    }

    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(|r| r.path.as_path())
    }

    /// Begin dispatch on every registered root.
    pub fn start(&mut self, handle: &Handle) -> Result<(), WatchError> {
        if self.is_active() {
            return Err(WatchError::AlreadyActive);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        self.active.store(true, Ordering::SeqCst);

        for root in &self.roots {
            let (raw_tx, raw_rx) = mpsc::unbounded_channel();
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let alive = Arc::new(AtomicBool::new(true));

            let collector = Collector {
                root: RootWatch::new(root.path.clone(), raw_tx),
                raw_rx,
                event_tx,
                debouncer: Debouncer::new(self.debounce),
                alive: alive.clone(),
                stop: stop_rx.clone(),
            };
            handle.spawn(collector.run());
            handle.spawn(dispatch(
                event_rx,
                root.on_change.clone(),
                self.active.clone(),
                alive,
            ));
        }

        self.stop_tx = Some(stop_tx);
        crate::debug!("watch"; "started {} root(s)", self.roots.len());
        Ok(())
    }

    /// Tear down all watches. Non-blocking and idempotent; no callback
    /// starts after this returns.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(true);
            crate::debug!("watch"; "stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for WatchRegistry {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Per-root collector: owns the notify watcher and the debouncer.
struct Collector {
    root: RootWatch,
    raw_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    event_tx: mpsc::UnboundedSender<ChangeEvent>,
    debouncer: Debouncer,
    alive: Arc<AtomicBool>,
    stop: watch::Receiver<bool>,
}

impl Collector {
    async fn run(mut self) {
        match self.root.attach() {
            Ok(RootStatus::Attached) => {
                crate::debug!("watch"; "watching {}", self.root.path().display());
            }
            Ok(_) => {
                crate::log!("watch"; "{} does not exist yet, waiting for it", self.root.path().display());
            }
            Err(e) => return self.abandon(&e.to_string()),
        }

        loop {
            if *self.stop.borrow() {
                break;
            }

            let tick = self.debouncer.sleep_duration().min(MAINTAIN_INTERVAL);
            tokio::select! {
                biased;
                _ = self.stop.changed() => break,
                Some(result) = self.raw_rx.recv() => match result {
                    Ok(event) => self.debouncer.add_event(&event),
                    Err(e) => crate::log!("watch"; "notify error in {}: {}", self.root.path().display(), e),
                },
                _ = tokio::time::sleep(tick) => {
                    match self.root.maintain() {
                        Ok(RootStatus::Lost) => {
                            return self.abandon("directory is no longer accessible");
                        }
                        Ok(_) => {}
                        Err(e) => return self.abandon(&e.to_string()),
                    }
                    if !self.flush() {
                        break;
                    }
                }
            }
        }
    }

    /// Forward ready changes. Returns `false` once the dispatcher is gone.
    fn flush(&mut self) -> bool {
        let Some(changes) = self.debouncer.take_if_ready() else {
            return true;
        };
        changes
            .into_iter()
            .all(|(path, kind)| self.event_tx.send(ChangeEvent::new(path, kind)).is_ok())
    }

    /// Stop this root for good, dropping anything still queued.
    fn abandon(mut self, reason: &str) {
        self.alive.store(false, Ordering::SeqCst);
        self.debouncer.clear();
        crate::log!("watch"; "stopped watching {}: {}", self.root.path().display(), reason);
    }
}

/// Per-root dispatcher: runs the callback for one event at a time.
async fn dispatch(
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
    on_change: ChangeCallback,
    active: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
) {
    while let Some(event) = events.recv().await {
        if !active.load(Ordering::SeqCst) || !alive.load(Ordering::SeqCst) {
            break;
        }

        crate::debug!("watch"; "{} {}", event.kind.label(), event.path.display());
        let callback = on_change.clone();
        let gate = active.clone();
        let result = tokio::task::spawn_blocking(move || {
            if gate.load(Ordering::SeqCst) {
                callback(event);
            }
        })
        .await;

        if let Err(e) = result {
            crate::log!("watch"; "change handler failed: {}", e);
        }
    }
}
