//! Supervisor lifecycle states.

use std::fmt;

/// Lifecycle state of the managed application.
///
/// ```text
/// Stopped -> Starting -> Running <-> Restarting
/// Starting -> Stopped                       (initial context failed)
/// Starting | Running | Restarting -> ShuttingDown -> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Stopped,
    Starting,
    Running,
    Restarting,
    ShuttingDown,
}

impl SupervisorState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Restarting => "restarting",
            Self::ShuttingDown => "shutting down",
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use SupervisorState::*;
        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Running, Restarting)
                | (Restarting, Running)
                | (Starting | Running | Restarting, ShuttingDown)
                | (ShuttingDown, Stopped)
        )
    }

    pub fn is_stopping(self) -> bool {
        matches!(self, Self::Stopped | Self::ShuttingDown)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
