//! `hotswap classpath`: show what `run` would use, without running anything.

use anyhow::Result;
use owo_colors::OwoColorize;

use super::run::{collect_layout, extension_rules};
use crate::config::HotswapConfig;

pub fn print_classpath(config: &HotswapConfig) -> Result<()> {
    let layout = collect_layout(config)?;

    println!("{} {}", "main:".bold(), layout.main);
    println!("{} {}", "mode:".bold(), config.run.mode);

    println!("{}", "classpath:".bold());
    for entry in layout.classpath.entries() {
        println!("  {:<10} {}", entry.kind.label().dimmed(), entry.path.display());
    }
    let missing: Vec<_> = layout
        .classpath
        .binary_candidates()
        .iter()
        .filter(|p| !layout.classpath.binaries().contains(p))
        .collect();
    for path in missing {
        println!("  {:<10} {} {}", "binary".dimmed(), path.display(), "(not built yet)".yellow());
    }

    println!("{}", "watch:".bold());
    for root in &layout.watch_roots {
        let note = if root.is_dir() { "" } else { " (missing)" };
        println!("  {}{}", root.display(), note.yellow());
    }

    let rules = extension_rules(config);
    println!("{} {}", "restart on:".bold(), rules.restart_extensions().join(", "));
    if layout.external_compiler() {
        println!("{}", "sources are compiled externally (marker file present)".dimmed());
    } else {
        println!("{} {}", "rebuild on:".bold(), rules.compile_extensions().join(", "));
    }
    Ok(())
}
