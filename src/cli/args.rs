//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Hotswap development supervisor CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: hotswap.toml)
    #[arg(short = 'C', long, global = true, default_value = "hotswap.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the application and restart it when watched files change
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Print the collected classpath, watch roots and main entry
    #[command(visible_alias = "cp")]
    Classpath {
        #[command(flatten)]
        args: RunArgs,
    },
}

/// Arguments shared by `run` and `classpath`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Main entry identifier (overrides `[run] main`)
    #[arg(short, long)]
    pub main: Option<String>,

    /// Execution mode passed to the application (overrides `[run] mode`)
    #[arg(short = 'M', long)]
    pub mode: Option<String>,
}

impl Cli {
    pub const fn run_args(&self) -> &RunArgs {
        match &self.command {
            Commands::Run { args } | Commands::Classpath { args } => args,
        }
    }
}
