use std::time::Duration;

use beacon_bus::Bus;
use beacon_config::{compile, instantiate, Registry};
use beacon_monitor::TaskMonitor;
use beacon_runtime::{ActorKind, TaskController, TerminationAction};
use std::sync::Arc;

#[path = "../src/plugins/mod.rs"]
mod plugins;

const CONFIG: &str = r#"
actors:
  text_record_monitor:
    entities:
      - name: feed_a
        update_interval_secs: 1
  text_record_filter:
    entities:
      - name: feed_a
        contains: "feed_a"
  text_record_action:
    entities:
      - name: feed_a

chains:
  demo:
    - text_record_monitor: [feed_a]
    - text_record_filter: [feed_a]
    - text_record_action: [feed_a]
"#;

#[tokio::test]
async fn monitor_filter_action_chain_delivers_matching_records() {
    let mut registry = Registry::default();
    plugins::register_builtin_plugins(&mut registry);

    let compiled = compile(CONFIG, &registry).expect("config compiles");
    let bus = Arc::new(Bus::new());
    let controller = TaskController::new();

    let (actors, _chains) = instantiate(&compiled, bus.clone()).await.expect("instantiate succeeds");

    for (actor, compiled_actor) in actors.iter().zip(&compiled.actors) {
        if compiled_actor.kind == ActorKind::Monitor {
            let source = plugins::TextRecordMonitorSource::new();
            let entities = plugins::build_monitor_entities(&compiled_actor.entities);
            TaskMonitor::spawn(&controller, actor.clone(), source, entities).await;
        }
    }

    tokio::time::sleep(Duration::from_millis(1200)).await;
    controller.terminate_after(Duration::ZERO, TerminationAction::Exit);
    controller.run_until_termination().await;

    let delivered = plugins::action_sink().lock().await.clone();
    assert!(!delivered.is_empty(), "expected at least one delivered record");
    assert!(delivered.iter().all(|text| text.starts_with("feed_a-")));
}
