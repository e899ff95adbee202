//! Command-line interface module.

mod args;
pub mod classpath;
pub mod run;

pub use args::{Cli, Commands, RunArgs};
