mod plugins;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use beacon_bus::Bus;
use beacon_config::{compile, instantiate, registry, RuntimeSettings};
use beacon_monitor::TaskMonitor;
use beacon_runtime::{install_signal_handlers, ActorKind, TaskController, TerminationAction};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Bootstrap logging with a sane default before the config file (which
    // carries the real log-level settings) has even been read.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    {
        let mut registry = registry().write().expect("plugin registry lock poisoned");
        plugins::register_builtin_plugins(&mut registry);
    }

    let config_path = std::env::args()
        .nth(1)
        .context("usage: beacon-engine <config.yaml>")?;
    let yaml = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config file {config_path}"))?;

    let compiled = {
        let registry = registry().read().expect("plugin registry lock poisoned");
        compile(&yaml, &registry)?
    };
    log_resolved_settings(&compiled.settings);

    let bus = Arc::new(Bus::new());
    let controller = TaskController::new();

    let (actors, _chains) = instantiate(&compiled, bus.clone()).await?;

    for (actor, compiled_actor) in actors.iter().zip(&compiled.actors) {
        if compiled_actor.kind == ActorKind::Monitor && compiled_actor.name == "text_record_monitor" {
            let source = plugins::TextRecordMonitorSource::new();
            let entities = plugins::build_monitor_entities(&compiled_actor.entities);
            TaskMonitor::spawn(&controller, actor.clone(), source, entities).await;
        }
    }

    let _signal_task = install_signal_handlers(controller.clone());

    let action = controller.run_until_termination().await;

    Ok(match action {
        TerminationAction::Exit => ExitCode::from(0),
        TerminationAction::Restart => ExitCode::from(2),
    })
}

/// Logs the log-level directive the config file asked for. The subscriber
/// itself was already installed from `RUST_LOG`/a default at process start,
/// since the config can't be read before logging exists to report its
/// own parse errors; this surfaces the mismatch rather than hiding it.
fn log_resolved_settings(settings: &RuntimeSettings) {
    tracing::info!(directive = %settings.env_filter_directive(), log_directory = %settings.log_directory, "resolved runtime settings");
}
