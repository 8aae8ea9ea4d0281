//! Actor lifecycle & task controller (components C3/C6): schedules
//! cooperative tasks, handles termination/restart, supervises exceptions,
//! and implements the common Monitor/Filter/Action handle loop + the
//! `on_record` publisher contract every variant uses to emit.

mod actor;
mod controller;
mod error;
mod signal;

pub use actor::{Actor, ActorKind, EntityBehavior, EntityHandle};
pub use controller::{TaskController, TerminationAction};
pub use error::RuntimeError;
pub use signal::install_signal_handlers;
