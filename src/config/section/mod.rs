//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hotswap.toml`:
//!
//! | Module    | TOML Section | Purpose                                     |
//! |-----------|--------------|---------------------------------------------|
//! | `project` | `[project]`  | Project layout: resources, sources, classpath |
//! | `run`     | `[run]`      | Managed application and change extensions   |
//! | `build`   | `[build]`    | Build command run before recompile restarts |

mod build;
mod project;
mod run;

pub use build::BuildConfig;
pub use project::ProjectConfig;
pub use run::RunConfig;
