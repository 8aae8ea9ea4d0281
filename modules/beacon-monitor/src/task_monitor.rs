use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_record::Record;
use beacon_runtime::{Actor, TaskController};
use tracing::warn;

use crate::scheduler::Scheduler;

/// Per-entity source of new records; the only abstract operation the base
/// monitor layer needs (§4.5 "TaskMonitor").
#[async_trait]
pub trait MonitorSource: Send + Sync {
    async fn get_new_records(&self, entity_name: &str) -> anyhow::Result<Vec<Record>>;
}

#[derive(Debug, Clone)]
pub struct MonitorEntity {
    pub name: String,
    pub update_interval: Duration,
}

/// Per entity, runs an infinite poll-publish-sleep loop. Any exception in
/// the loop body terminates that entity's task (not the actor); other
/// entities and actors continue.
pub struct TaskMonitor;

impl TaskMonitor {
    pub async fn spawn<S>(
        controller: &Arc<TaskController>,
        actor: Arc<Actor>,
        source: Arc<S>,
        entities: Vec<MonitorEntity>,
    ) where
        S: MonitorSource + 'static,
    {
        let offsets = Scheduler::stagger_offsets(
            &entities.iter().map(|e| e.update_interval).collect::<Vec<_>>(),
        );

        for (entity, offset) in entities.into_iter().zip(offsets) {
            let actor = actor.clone();
            let source = source.clone();
            let task_name = format!("monitor:{}:{}", actor.name, entity.name);

            controller
                .create_task(task_name, async move {
                    if !offset.is_zero() {
                        tokio::time::sleep(offset).await;
                    }
                    loop {
                        match source.get_new_records(&entity.name).await {
                            Ok(records) => {
                                for record in records {
                                    actor.on_record(&entity.name, record).await;
                                }
                            }
                            Err(err) => {
                                warn!(entity = %entity.name, error = %err, "monitor task body failed, terminating this entity's task");
                                return;
                            }
                        }
                        tokio::time::sleep(entity.update_interval).await;
                    }
                })
                .await;
        }
    }
}
