//! Core process-wide state.
//!
//! - `signal` - Termination signal hook (Ctrl+C / SIGTERM)

pub mod signal;
