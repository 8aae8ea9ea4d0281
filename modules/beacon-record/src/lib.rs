//! Core data model shared by every other `beacon-*` crate: the record
//! envelope, topic addressing, chain shape, and the common entity flags
//! every plugin entity carries.

mod chain;
mod entity;
mod error;
mod event;
mod record;
mod topic;

pub use chain::{Chain, ChainCard};
pub use entity::{CommonEntityConfig, ResolvedTimezone};
pub use error::RecordError;
pub use event::{Event, EventKind};
pub use record::Record;
pub use topic::{Direction, Topic};
