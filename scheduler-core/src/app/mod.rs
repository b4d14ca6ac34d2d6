//! Application-level glue: the multi-tenant [`Supervisor`] and the
//! top-level [`SchedulerError`] its fallible entry points return.

mod error;
mod supervisor;

pub use error::SchedulerError;
pub use supervisor::Supervisor;
