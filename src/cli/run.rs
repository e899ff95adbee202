//! `hotswap run`: supervise the application until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::build::CommandBuild;
use crate::config::HotswapConfig;
use crate::project::{ClasspathCollector, Conventions, EntryKind, ManifestModel, ProjectLayout};
use crate::reload::ExtensionRules;
use crate::supervisor::{AppSupervisor, ContextFactory, ProcessFactory, SupervisorSettings, hotswap_vars};
use crate::{debug, log};

/// Collect main entry, classpath and watch roots for the configured project.
pub fn collect_layout(config: &HotswapConfig) -> Result<ProjectLayout> {
    let model = ManifestModel::new(config.get_root(), config.project.clone());
    let layout =
        ClasspathCollector::collect(&model, config.explicit_main(), &Conventions::from_config(config))?;
    Ok(layout)
}

pub fn run(config: &HotswapConfig) -> Result<()> {
    let layout = collect_layout(config)?;
    let root = config.get_root();
    let mode = config.run.mode.clone();

    let factory = ProcessFactory::new(config.run.command.clone(), root, layout.main.clone());
    factory
        .check(&layout.classpath, &mode)
        .context("cannot launch the application")?;

    let vars = hotswap_vars(root, &layout.main, &mode, &layout.classpath)?;
    let build = CommandBuild::new(config.build.command.clone(), root)
        .with_release(config.build.release.clone())
        .with_vars(vars);

    let settings = SupervisorSettings {
        main: layout.main.clone(),
        mode,
        shutdown_hook: config.run.shutdown_hook,
        debounce: Duration::from_millis(config.run.debounce_ms),
    };
    let supervisor = AppSupervisor::new(settings, Box::new(factory), Arc::new(build));

    let rules = extension_rules(config);
    register(&supervisor, &layout, rules)?;

    if layout.external_compiler() {
        log!("run"; "external compiler detected, watching compiled output instead of sources");
    }
    supervisor.start()?;
    log!("run"; "stopped");
    Ok(())
}

/// Hand the collected layout to the supervisor.
pub fn extension_rules(config: &HotswapConfig) -> ExtensionRules {
    ExtensionRules::new(
        config.run.restart_extensions.iter().cloned(),
        config.run.compile_extensions.iter().cloned(),
    )
}

fn register(supervisor: &AppSupervisor, layout: &ProjectLayout, rules: ExtensionRules) -> Result<()> {
    for entry in layout.classpath.entries() {
        match entry.kind {
            EntryKind::Resource => supervisor.add_resource(entry.path)?,
            EntryKind::Dependency => supervisor.add_dependency(entry.path)?,
            EntryKind::BinaryDirectory => {}
        }
    }
    for dir in layout.classpath.binary_candidates() {
        supervisor.add_binary_directory(dir)?;
    }

    let on_change = supervisor.change_handler(rules);
    for root in &layout.watch_roots {
        debug!("watch"; "adding root {}", root.display());
        supervisor.add_watch(root, on_change.clone())?;
    }
    Ok(())
}
