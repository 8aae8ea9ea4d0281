use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_bus::Bus;
use beacon_record::{CommonEntityConfig, Direction, Record, Topic};
use futures::FutureExt;
use tracing::{instrument, warn};

use crate::error::RuntimeError;

/// Which of the three actor variants owns a record's processing (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    Monitor,
    Filter,
    Action,
}

/// A named configuration row inside an actor. `common` holds the flags
/// shared by every plugin entity; plugin-specific fields live outside this
/// crate, in the plugin's own config struct, which `behavior` closes over.
#[derive(Debug, Clone)]
pub struct EntityHandle {
    pub name: String,
    pub common: CommonEntityConfig,
}

/// The plugin-supplied half of a Filter/Action actor. Monitor actors never
/// call these; the default implementations exist so a Monitor's
/// `EntityBehavior` can be a trivial unit struct.
#[async_trait]
pub trait EntityBehavior: Send + Sync {
    /// Filter's abstract `match`: `None` drops the record.
    async fn filter_match(&self, _entity_name: &str, _record: &Record) -> Option<Record> {
        None
    }

    /// Action's abstract `handle`: side-effects the outside world.
    async fn action_handle(&self, _entity_name: &str, _record: &Record) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Common actor behavior shared by Monitor, Filter, and Action plugins: a
/// name, an entity map, a bus handle, and the handle loop + publisher
/// contract of §4.3. Construction auto-subscribes every entity's
/// `inputs/<actor>/<entity>` topic to [`Actor::dispatch_record`].
pub struct Actor {
    pub name: String,
    kind: ActorKind,
    entities: HashMap<String, EntityHandle>,
    bus: Arc<Bus>,
    behavior: Arc<dyn EntityBehavior>,
}

impl Actor {
    pub fn new(
        name: impl Into<String>,
        kind: ActorKind,
        entities: Vec<EntityHandle>,
        bus: Arc<Bus>,
        behavior: Arc<dyn EntityBehavior>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
            entities: entities.into_iter().map(|e| (e.name.clone(), e)).collect(),
            bus,
            behavior,
        })
    }

    pub fn entity(&self, name: &str) -> Option<&EntityHandle> {
        self.entities.get(name)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(|s| s.as_str())
    }

    /// Subscribes the handle loop on `inputs/<actor>/<entity>` for every
    /// entity. Exceptions inside [`Actor::dispatch_record`] are caught and
    /// logged by the bus's own delivery loop (§4.1); this method installs
    /// the subscription, it doesn't itself need a try/catch wrapper.
    pub async fn install(self: &Arc<Self>) {
        for entity_name in self.entities.keys().cloned().collect::<Vec<_>>() {
            let topic = Topic::new(Direction::Inputs, self.name.clone(), entity_name.clone(), "");
            let this = self.clone();
            self.bus
                .sub(
                    &topic,
                    Arc::new(move |_topic, record| {
                        let this = this.clone();
                        let entity_name = entity_name.clone();
                        async move { this.dispatch_record(&entity_name, record).await.map_err(Into::into) }
                            .boxed()
                    }),
                )
                .await;
        }
    }

    #[instrument(skip(self, record), fields(actor = %self.name, entity = %entity_name))]
    async fn dispatch_record(&self, entity_name: &str, record: Record) -> Result<(), RuntimeError> {
        let entity = self
            .entity(entity_name)
            .ok_or_else(|| RuntimeError::UnknownEntity(self.name.clone(), entity_name.to_string()))?
            .clone();

        match self.kind {
            ActorKind::Monitor => {
                // Monitors can sit mid-chain: re-emit the incoming record.
                self.on_record(entity_name, record).await;
            }
            ActorKind::Filter => {
                if let Some(mut out) = self.behavior.filter_match(entity_name, &record).await {
                    if out.origin_is_empty() {
                        out.set_origin(record.origin());
                    }
                    if out.chain().is_empty() && !record.chain().is_empty() {
                        out.set_chain(record.chain());
                    }
                    self.on_record(entity_name, out).await;
                }
            }
            ActorKind::Action => {
                let record = match entity.common.resolved_timezone()? {
                    Some(tz) => record.as_timezone(tz)?,
                    None => record,
                };
                let skip = entity.common.event_passthrough && record.is_event();
                if !skip {
                    self.behavior.action_handle(entity_name, &record).await?;
                }
                if !entity.common.consume_record {
                    self.on_record(entity_name, record).await;
                }
            }
        }
        Ok(())
    }

    /// The publisher contract every actor variant (and `beacon-monitor`'s
    /// polling loops, which call this directly rather than through
    /// `dispatch_record`) uses to emit (§4.3 `on_record`).
    pub async fn on_record(&self, entity_name: &str, mut record: Record) {
        let Some(entity) = self.entity(entity_name) else {
            warn!(actor = %self.name, entity = %entity_name, "on_record for unknown entity");
            return;
        };

        let origin = format!("{}:{}", self.name, entity_name);
        if record.origin() == origin {
            warn!(actor = %self.name, entity = %entity_name, "dropping record: would publish back into its own origin");
            return;
        }
        if record.origin_is_empty() {
            record.set_origin(origin);
        }
        if entity.common.reset_origin {
            record.clear_chain();
        }

        let topic = Topic::new(
            Direction::Output,
            self.name.clone(),
            entity_name.to_string(),
            record.chain().to_string(),
        );
        self.bus.publish(&topic, record).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopBehavior;
    #[async_trait]
    impl EntityBehavior for NoopBehavior {}

    fn entity(name: &str) -> EntityHandle {
        EntityHandle {
            name: name.to_string(),
            common: CommonEntityConfig::default(),
        }
    }

    #[tokio::test]
    async fn on_record_sets_origin_once() {
        let bus = Arc::new(Bus::new());
        let actor = Actor::new(
            "mon",
            ActorKind::Monitor,
            vec![entity("m1")],
            bus.clone(),
            Arc::new(NoopBehavior),
        );

        let captured: Arc<tokio::sync::Mutex<Option<Record>>> = Arc::new(tokio::sync::Mutex::new(None));
        let captured_clone = captured.clone();
        let topic = Topic::new(Direction::Output, "mon", "m1", "");
        bus.sub(
            &topic,
            Arc::new(move |_t, r| {
                let captured = captured_clone.clone();
                async move {
                    *captured.lock().await = Some(r);
                    Ok(())
                }
                .boxed()
            }),
        )
        .await;

        actor.on_record("m1", Record::new("text_record")).await;

        let got = captured.lock().await.clone().unwrap();
        assert_eq!(got.origin(), "mon:m1");
    }

    #[tokio::test]
    async fn on_record_drops_cycle_back_to_own_origin() {
        let bus = Arc::new(Bus::new());
        let actor = Actor::new(
            "f",
            ActorKind::Filter,
            vec![entity("f1")],
            bus.clone(),
            Arc::new(NoopBehavior),
        );

        let delivered = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let delivered_clone = delivered.clone();
        let topic = Topic::new(Direction::Output, "f", "f1", "");
        bus.sub(
            &topic,
            Arc::new(move |_t, _r| {
                delivered_clone.store(true, std::sync::atomic::Ordering::SeqCst);
                async { Ok(()) }.boxed()
            }),
        )
        .await;

        let mut record = Record::new("text_record");
        record.set_origin("f:f1");
        actor.on_record("f1", record).await;

        assert!(!delivered.load(std::sync::atomic::Ordering::SeqCst));
    }
}
