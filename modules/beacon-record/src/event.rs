use serde_json::json;

use crate::record::Record;

/// Plugin-internal occurrence kinds. Plugins aren't limited to these — any
/// string is accepted by [`Event::new`] — but these cover the cases the
/// core itself raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Generic,
    Error,
    Started,
    Finished,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Generic => "generic",
            EventKind::Error => "error",
            EventKind::Started => "started",
            EventKind::Finished => "finished",
        }
    }
}

/// Builds an `event`-class [`Record`]. Not a distinct Rust type from
/// `Record` — the bus and store only ever see `Record` — but a constructor
/// that enforces the Event invariant: `origin`/`chain` are copied from the
/// nested cause record, if any, so downstream filters route the event the
/// same way they'd route the record that caused it.
pub struct Event;

impl Event {
    pub fn new(kind: EventKind, text: impl Into<String>, cause: Option<Record>) -> Record {
        Self::new_with_type(kind.as_str(), text, cause)
    }

    pub fn new_with_type(event_type: &str, text: impl Into<String>, cause: Option<Record>) -> Record {
        let mut record = Record::new("event")
            .with_field("event_type", json!(event_type))
            .with_field("text", json!(text.into()));
        if let Some(cause) = cause {
            record.set_origin(cause.origin());
            record.set_chain(cause.chain());
            record = record.with_cause(cause);
        }
        record
    }
}
