use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use beacon_record::{Direction, Record, Topic};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::BusError;

const HISTORY_CAPACITY: usize = 20;

/// A subscriber callback: given the topic it was delivered on and the
/// (possibly chain-rewritten) record, do something. Errors are caught and
/// logged by the bus; they never abort delivery to the remaining subscribers
/// (§4.1 "Failure semantics").
pub type Callback = Arc<dyn Fn(Topic, Record) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Clone)]
struct Subscription {
    chain_pattern: String,
    callback: Callback,
}

type SubKey = (Direction, String, String);

/// In-process pub/sub substrate. Topic hierarchy is
/// `direction/actor/entity/chain`; subscriptions are keyed on
/// `(direction, actor, entity)` with the chain pattern checked per-delivery
/// so that chain-specific and wildcard subscriptions can coexist.
pub struct Bus {
    subscriptions: RwLock<HashMap<SubKey, Vec<Subscription>>>,
    history: RwLock<HashMap<String, VecDeque<Record>>>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
        }
    }

    fn key_of(topic: &Topic) -> SubKey {
        (topic.direction, topic.actor.clone(), topic.entity.clone())
    }

    /// Appends `callback`. Two identical `sub` calls both register and both
    /// deliver — subscriptions are a list, not a set (I5).
    pub async fn sub(&self, topic: &Topic, callback: Callback) {
        let key = Self::key_of(topic);
        self.subscriptions
            .write()
            .await
            .entry(key)
            .or_default()
            .push(Subscription {
                chain_pattern: topic.chain.clone(),
                callback,
            });
    }

    /// Computes matching subscribers and delivers, per §4.1's matching rule.
    /// Delivery to each subscriber happens synchronously, one after another,
    /// before `publish` returns — so a publish is effectively atomic with
    /// respect to other bus activity on this single-threaded scheduler.
    pub async fn publish(&self, topic: &Topic, record: Record) {
        let key = Self::key_of(topic);
        let matching: Vec<Subscription> = {
            let subs = self.subscriptions.read().await;
            match subs.get(&key) {
                Some(list) => list
                    .iter()
                    .filter(|s| s.chain_pattern.is_empty() || record.chain().is_empty() || s.chain_pattern == record.chain())
                    .cloned()
                    .collect(),
                None => Vec::new(),
            }
        };

        if matching.is_empty() {
            return;
        }

        let generic_key = topic.generic().to_string();

        for sub in matching {
            let delivered = if record.chain().is_empty() {
                let mut r = record.clone();
                r.set_chain(sub.chain_pattern.clone());
                r
            } else {
                record.clone()
            };

            let fut = (sub.callback)(topic.clone(), delivered.clone());
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(topic = %topic, error = %err, "subscriber returned an error; continuing delivery");
                }
                Err(_) => {
                    warn!(topic = %topic, "subscriber panicked; continuing delivery");
                }
            }

            self.append_history(&generic_key, delivered).await;
        }
    }

    async fn append_history(&self, generic_key: &str, record: Record) {
        let mut history = self.history.write().await;
        let ring = history.entry(generic_key.to_string()).or_default();
        ring.push_back(record);
        while ring.len() > HISTORY_CAPACITY {
            ring.pop_front();
        }
    }

    /// Chronological slice of the history ring for `direction/actor/entity`,
    /// optionally narrowed to one chain.
    pub async fn get_history(
        &self,
        direction: Direction,
        actor: &str,
        entity: &str,
        chain: Option<&str>,
    ) -> Vec<Record> {
        let generic_key = Topic::new(direction, actor, entity, "").to_string();
        let history = self.history.read().await;
        match history.get(&generic_key) {
            None => Vec::new(),
            Some(ring) => match chain {
                None => ring.iter().cloned().collect(),
                Some(c) => ring.iter().filter(|r| r.chain() == c).cloned().collect(),
            },
        }
    }

    pub async fn clear_subscriptions(&self) {
        self.subscriptions.write().await.clear();
    }

    /// Persists the history ring only — never live subscriptions, which are
    /// rebuilt by the chain compiler/actor construction on every start.
    pub async fn dump_state(&self, dir: &Path) -> Result<(), BusError> {
        std::fs::create_dir_all(dir).map_err(|e| BusError::DumpState(dir.display().to_string(), e))?;
        let history = self.history.read().await;
        for (key, ring) in history.iter() {
            let file_name = sanitize_key(key);
            let path = dir.join(format!("{file_name}.json"));
            let records: Vec<&Record> = ring.iter().collect();
            let json = serde_json::to_string_pretty(&records)
                .map_err(|e| BusError::Serialize(key.clone(), e))?;
            std::fs::write(&path, json).map_err(|e| BusError::DumpState(path.display().to_string(), e))?;
        }
        Ok(())
    }

    pub async fn apply_state(&self, dir: &Path) -> Result<(), BusError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(BusError::ApplyState(dir.display().to_string(), e)),
        };

        let mut history = self.history.write().await;
        for entry in entries {
            let entry = entry.map_err(|e| BusError::ApplyState(dir.display().to_string(), e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| BusError::ApplyState(path.display().to_string(), e))?;
            let records: Vec<Record> = serde_json::from_str(&contents)
                .map_err(|e| BusError::Deserialize(path.display().to_string(), e))?;
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .replace('_', "/");
            history.insert(key, records.into());
        }
        Ok(())
    }
}

fn sanitize_key(key: &str) -> String {
    key.replace('/', "_")
}
