//! Errors raised by the priority queue.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is full (maxsize={maxsize})")]
    QueueFull { maxsize: usize },

    #[error("invalid item: {0}")]
    InvalidItem(String),

    #[error("operation not allowed")]
    NotAllowed,
}
