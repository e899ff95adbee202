//! Project Model
//!
//! Reads the project layout and turns it into the classpath and watch roots
//! the supervisor runs with.
//!
//! # Modules
//!
//! - `model` - `BuildModel` trait and the `hotswap.toml` backed `ManifestModel`
//! - `classpath` - Classpath entries and the `ClasspathCollector`

pub mod classpath;
pub mod model;

pub use classpath::{Classpath, ClasspathCollector, Conventions, EntryKind, ProjectLayout};
pub use model::ManifestModel;
