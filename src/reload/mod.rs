//! Reload Module
//!
//! Turns filesystem changes into restarts of the managed application.
//!
//! ```text
//! ChangeEvent -> classify -> ReloadCoordinator -> [build] -> restart
//! ```
//!
//! # Modules
//!
//! - `classify` - Extension-based change classification
//! - `coordinator` - Single-flight, coalescing reload execution

pub mod classify;
pub mod coordinator;

pub use classify::{Classification, ExtensionRules};
pub use coordinator::{ReloadCoordinator, ReloadOutcome, ReloadTarget};
