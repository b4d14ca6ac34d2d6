//! The wrapper pairing a queued item with its scheduling priority.

/// An item queued at a given priority. Lower `priority` sorts first (I2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrioritizedItem<T> {
    pub priority: i64,
    pub item: T,
}

impl<T> PrioritizedItem<T> {
    pub fn new(priority: i64, item: T) -> Self {
        Self { priority, item }
    }
}
