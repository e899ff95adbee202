use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// One debounced filesystem change under a watch root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub observed_at: SystemTime,
}

impl ChangeEvent {
    pub fn new(path: PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            observed_at: SystemTime::now(),
        }
    }
}

/// Per-root change handler. Runs on the blocking pool and may block.
pub type ChangeCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;
