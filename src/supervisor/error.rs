//! Supervisor error types.

use std::io;

use thiserror::Error;

use super::context::ContextError;
use super::state::SupervisorState;
use crate::core::signal::SignalError;
use crate::watch::WatchError;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("cannot {op} while {state}")]
    InvalidState {
        op: &'static str,
        state: SupervisorState,
    },

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("failed to create async runtime")]
    Runtime(#[source] io::Error),

    /// The application could not be kept alive; the supervisor shut down.
    #[error("{0}")]
    Fatal(String),
}
