use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use super::WatchError;

/// Attachment state of one watch root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RootStatus {
    /// Directory does not exist yet.
    Pending,
    Attached,
    /// Directory vanished after being attached.
    Lost,
}

/// Watch-root consistency manager.
///
/// Responsibility:
/// - Attach the root if it exists at startup
/// - Attach it later once it appears
/// - Notice when an attached root goes away
pub(super) struct RootWatch {
    path: PathBuf,
    events: UnboundedSender<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: Option<RecommendedWatcher>,
}

impl RootWatch {
    pub(super) fn new(path: PathBuf, events: UnboundedSender<notify::Result<notify::Event>>) -> Self {
        Self {
            path,
            events,
            watcher: None,
        }
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn attach(&mut self) -> Result<RootStatus, WatchError> {
        if self.watcher.is_some() {
            return Ok(RootStatus::Attached);
        }
        if !self.path.is_dir() {
            return Ok(RootStatus::Pending);
        }

        let tx = self.events.clone();
        let attach_error = |source| WatchError::Attach {
            path: self.path.clone(),
            source,
        };
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .map_err(attach_error)?;
        watcher
            .watch(&self.path, RecursiveMode::Recursive)
            .map_err(attach_error)?;

        self.watcher = Some(watcher);
        Ok(RootStatus::Attached)
    }

    pub(super) fn maintain(&mut self) -> Result<RootStatus, WatchError> {
        if self.watcher.is_none() {
            let status = self.attach()?;
            if status == RootStatus::Attached {
                crate::log!("watch"; "root appeared, watching {}", self.path.display());
            }
            return Ok(status);
        }

        if self.path.is_dir() {
            Ok(RootStatus::Attached)
        } else {
            // Drop the stale handle.
            self.watcher = None;
            Ok(RootStatus::Lost)
        }
    }
}
