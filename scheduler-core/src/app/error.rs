//! Top-level application error, wrapping the leaf error types raised by
//! the queue and service layers. Mirrors the teacher's `AppError`: a
//! manual `Display`/`Error` impl with `From` conversions, rather than a
//! `thiserror` derive, at the bootstrap boundary.

use std::fmt;

use crate::queue::QueueError;
use crate::services::ServiceError;

#[derive(Debug)]
pub enum SchedulerError {
    /// A service failed its startup health check; scheduler creation for
    /// that organisation is abandoned (§7).
    ServiceUnavailable(ServiceError),

    /// The priority queue rejected an operation during setup.
    Queue(QueueError),

    /// Malformed or missing configuration.
    Config(String),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::ServiceUnavailable(e) => write!(f, "service unavailable: {e}"),
            SchedulerError::Queue(e) => write!(f, "queue error: {e}"),
            SchedulerError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::ServiceUnavailable(e) => Some(e),
            SchedulerError::Queue(e) => Some(e),
            SchedulerError::Config(_) => None,
        }
    }
}

impl From<ServiceError> for SchedulerError {
    fn from(e: ServiceError) -> Self {
        SchedulerError::ServiceUnavailable(e)
    }
}

impl From<QueueError> for SchedulerError {
    fn from(e: QueueError) -> Self {
        SchedulerError::Queue(e)
    }
}
