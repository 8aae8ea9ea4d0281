use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha1::{Digest, Sha1};

use crate::entity::ResolvedTimezone;
use crate::error::RecordError;

/// The unit of data flowing through the bus.
///
/// `fields` holds arbitrary plugin-specific values (title, url, author, ...)
/// as an opaque name→value map rather than a closed set of typed columns, so
/// the runtime never needs to know a plugin's schema to route or store a
/// record. `class_name` records the logical record type (e.g. `"rss_entry"`,
/// `"event"`) for the on-disk store's `class_name` column and for dispatch
/// decisions like [`Record::is_event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    origin: String,
    chain: String,
    created_at: DateTime<Utc>,
    class_name: String,
    uid_seed: Option<String>,
    fields: BTreeMap<String, Value>,
    cause: Option<Box<Record>>,
}

impl Record {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            origin: String::new(),
            chain: String::new(),
            created_at: Utc::now(),
            class_name: class_name.into(),
            uid_seed: None,
            fields: BTreeMap::new(),
            cause: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Supplies a source-stable identity (e.g. a feed entry's GUID) so that
    /// [`Record::uid`] reflects logical identity rather than current content.
    /// Without this, `uid()` falls back to `hash()`, per spec default.
    pub fn with_uid_seed(mut self, seed: impl Into<String>) -> Self {
        self.uid_seed = Some(seed.into());
        self
    }

    pub fn with_cause(mut self, cause: Record) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn is_event(&self) -> bool {
        self.class_name == "event"
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn set_origin(&mut self, origin: impl Into<String>) {
        self.origin = origin.into();
    }

    pub fn origin_is_empty(&self) -> bool {
        self.origin.is_empty()
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn set_chain(&mut self, chain: impl Into<String>) {
        self.chain = chain.into();
    }

    pub fn clear_chain(&mut self) {
        self.chain.clear();
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn cause(&self) -> Option<&Record> {
        self.cause.as_deref()
    }

    /// Canonical JSON: sorted keys, unknown/non-JSON-native values already
    /// stringified by the caller when inserted via [`Record::with_field`].
    pub fn as_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("class_name".into(), json!(self.class_name));
        obj.insert("origin".into(), json!(self.origin));
        obj.insert("chain".into(), json!(self.chain));
        obj.insert("created_at".into(), json!(self.created_at.to_rfc3339()));
        for (k, v) in &self.fields {
            obj.insert(k.clone(), v.clone());
        }
        if let Some(cause) = &self.cause {
            obj.insert("cause".into(), cause.as_json());
        }
        Value::Object(obj)
    }

    /// SHA-1 of the canonical JSON serialization; changes whenever any field
    /// changes.
    pub fn hash(&self) -> String {
        let canonical = self.as_json().to_string();
        let mut hasher = Sha1::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Stable identity across content updates of the same logical item.
    /// Uses the plugin-supplied seed if present, otherwise falls back to
    /// `hash()` (the spec's stated default).
    pub fn uid(&self) -> String {
        match &self.uid_seed {
            Some(seed) => {
                let mut hasher = Sha1::new();
                hasher.update(seed.as_bytes());
                hex::encode(hasher.finalize())
            }
            None => self.hash(),
        }
    }

    /// Deep copy with every RFC3339-parseable datetime field (including
    /// `created_at`) converted to `tz`. `tz` may be a fixed numeric offset
    /// or a named IANA zone, whose offset is resolved per converted instant
    /// (so DST boundaries are honored).
    pub fn as_timezone(&self, tz: ResolvedTimezone) -> Result<Record, RecordError> {
        let mut copy = self.clone();
        copy.created_at = match tz {
            ResolvedTimezone::Fixed(offset) => self.created_at.with_timezone(&offset).with_timezone(&Utc),
            ResolvedTimezone::Named(named) => self.created_at.with_timezone(&named).with_timezone(&Utc),
        };
        for (name, value) in copy.fields.iter_mut() {
            if let Value::String(s) = value {
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    *s = match tz {
                        ResolvedTimezone::Fixed(offset) => dt.with_timezone(&offset).to_rfc3339(),
                        ResolvedTimezone::Named(named) => dt.with_timezone(&named).to_rfc3339(),
                    };
                } else if s.len() > 64 {
                    // leave long non-datetime strings alone; only well-formed
                    // timestamps are reinterpreted per field.
                    let _ = name;
                }
            }
        }
        if let Some(cause) = &copy.cause {
            copy.cause = Some(Box::new(cause.as_timezone(tz)?));
        }
        Ok(copy)
    }

    /// Full text rendering for logs/output.
    pub fn text(&self) -> String {
        let mut parts = vec![format!("{}[{}]", self.class_name, self.origin)];
        for (k, v) in &self.fields {
            parts.push(format!("{k}={v}"));
        }
        parts.join(" ")
    }

    /// Truncated single-line rendering.
    pub fn short_text(&self) -> String {
        const MAX: usize = 80;
        let full = self.text();
        if full.chars().count() <= MAX {
            full
        } else {
            let truncated: String = full.chars().take(MAX).collect();
            format!("{truncated}...")
        }
    }
}
