//! DTOs returned by the admin HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueItem {
    pub priority: i64,
    pub item: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct QueueView {
    pub id: String,
    pub size: usize,
    pub maxsize: usize,
    pub pq: Vec<QueueItem>,
}
