//! In-process publish/subscribe substrate (component C1). Topics encode
//! direction, actor, entity, and chain; a bounded per-topic history ring
//! supports state persistence across restarts of the process (not of
//! in-flight records, which are not durable per the engine's non-goals).

mod bus;
mod error;

pub use bus::{Bus, Callback};
pub use error::BusError;
