//! Hotswap - restart a JVM application whenever its project changes.

mod build;
mod cli;
mod config;
mod core;
mod logger;
mod project;
mod reload;
mod supervisor;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::HotswapConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = HotswapConfig::load(&cli)?;

    match &cli.command {
        Commands::Run { .. } => cli::run::run(&config),
        Commands::Classpath { .. } => cli::classpath::print_classpath(&config),
    }
}
