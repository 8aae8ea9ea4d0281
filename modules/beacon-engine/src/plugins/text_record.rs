use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use beacon_monitor::{MonitorEntity, MonitorSource};
use beacon_record::Record;
use beacon_runtime::EntityBehavior;
use serde::Deserialize;
use serde_json::json;
use serde_yaml::Value;
use tokio::sync::Mutex;
use tracing::info;

/// Test-fixture plugin triple (Monitor/Filter/Action) exercising the full
/// plugin contract end-to-end; not a real site integration (§1 non-goal).

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct MonitorEntityConfig {
    update_interval_secs: u64,
}

impl Default for MonitorEntityConfig {
    fn default() -> Self {
        Self { update_interval_secs: 1 }
    }
}

/// Emits one new record per poll, numbered per entity so repeated polls are
/// trivially distinguishable in tests.
pub struct TextRecordMonitorSource {
    counters: Mutex<BTreeMap<String, u64>>,
}

impl TextRecordMonitorSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            counters: Mutex::new(BTreeMap::new()),
        })
    }
}

#[async_trait]
impl MonitorSource for TextRecordMonitorSource {
    async fn get_new_records(&self, entity_name: &str) -> anyhow::Result<Vec<Record>> {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(entity_name.to_string()).or_insert(0);
        *counter += 1;
        let text = format!("{entity_name}-{counter}");
        Ok(vec![Record::new("text_record")
            .with_uid_seed(text.clone())
            .with_field("text", json!(text))])
    }
}

/// Builds the monitor source and the per-entity polling schedule from the
/// compiled entity list; called directly by `main`, since wiring a
/// `TaskMonitor` needs a `TaskController` the generic plugin factory
/// signature in `beacon-config` doesn't carry.
pub fn build_monitor_entities(entities: &[(String, Value)]) -> Vec<MonitorEntity> {
    entities
        .iter()
        .map(|(name, value)| {
            let config: MonitorEntityConfig = serde_yaml::from_value(value.clone()).unwrap_or_default();
            MonitorEntity {
                name: name.clone(),
                update_interval: std::time::Duration::from_secs(config.update_interval_secs.max(1)),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct FilterEntityConfig {
    contains: String,
}

impl Default for FilterEntityConfig {
    fn default() -> Self {
        Self { contains: String::new() }
    }
}

/// Passes a record through iff its `text` field contains the entity's
/// configured substring (an empty substring matches everything).
pub struct TextRecordFilterBehavior {
    per_entity: BTreeMap<String, FilterEntityConfig>,
}

impl TextRecordFilterBehavior {
    pub fn new(entities: &[(String, Value)]) -> Arc<Self> {
        let per_entity = entities
            .iter()
            .map(|(name, value)| (name.clone(), serde_yaml::from_value(value.clone()).unwrap_or_default()))
            .collect();
        Arc::new(Self { per_entity })
    }
}

#[async_trait]
impl EntityBehavior for TextRecordFilterBehavior {
    async fn filter_match(&self, entity_name: &str, record: &Record) -> Option<Record> {
        let config = self.per_entity.get(entity_name)?;
        let text = record.field("text")?.as_str()?;
        if text.contains(&config.contains) {
            Some(record.clone())
        } else {
            None
        }
    }
}

static ACTION_SINK: OnceLock<Arc<Mutex<Vec<String>>>> = OnceLock::new();
static ACTION_DELIVERY_COUNT: AtomicU64 = AtomicU64::new(0);

/// The shared delivery log every `TextRecordActionBehavior` instance writes
/// to — a stand-in for "do something with the record" (e.g. write a file,
/// call a webhook) that tests can inspect directly.
pub fn action_sink() -> Arc<Mutex<Vec<String>>> {
    ACTION_SINK.get_or_init(|| Arc::new(Mutex::new(Vec::new()))).clone()
}

pub fn action_delivery_count() -> u64 {
    ACTION_DELIVERY_COUNT.load(Ordering::SeqCst)
}

pub struct TextRecordActionBehavior;

impl TextRecordActionBehavior {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl EntityBehavior for TextRecordActionBehavior {
    async fn action_handle(&self, entity_name: &str, record: &Record) -> anyhow::Result<()> {
        let text = record.field("text").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        info!(entity = %entity_name, text = %text, "text_record action delivered");
        action_sink().lock().await.push(text);
        ACTION_DELIVERY_COUNT.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
