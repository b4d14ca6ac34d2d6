//! Introspection and manual push/pop HTTP surface (§6.1). The supervisor
//! owns an [`AdminState`] and registers each scheduler's queue into it;
//! this module never sees the schedulers themselves.

mod router;
mod state;
mod views;

pub use router::router;
pub use state::{AdminQueue, AdminState, ServiceHealth};
pub use views::{QueueItem, QueueView};
