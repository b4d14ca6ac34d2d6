//! Type-erased, read-mostly handles onto each scheduler's queue, so the
//! admin HTTP surface can list/push/pop without knowing whether a given
//! queue id is a `BoefjeTask` or `NormalizerTask` queue (§9: admin HTTP
//! gets a borrowed/shared handle, never the owning scheduler).

use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::views::{QueueItem, QueueView};
use crate::domain::HasIdentity;
use crate::queue::{PriorityQueue, QueueError};
use crate::services::HttpClient;

/// Object-safe facade over `PriorityQueue<T>` for a single named queue.
pub trait AdminQueue: Send + Sync {
    fn id(&self) -> &str;
    fn view(&self) -> QueueView;
    fn pop(&self) -> Option<QueueItem>;
    fn push(&self, item: QueueItem) -> Result<(), QueueError>;
}

struct NamedQueue<T: HasIdentity + Clone> {
    id: String,
    queue: Arc<PriorityQueue<T>>,
}

impl<T> AdminQueue for NamedQueue<T>
where
    T: HasIdentity + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn view(&self) -> QueueView {
        let pq = self
            .queue
            .snapshot()
            .into_iter()
            .map(|(priority, item)| QueueItem {
                priority,
                item: serde_json::to_value(item).unwrap_or(serde_json::Value::Null),
            })
            .collect();
        QueueView { id: self.id.clone(), size: self.queue.len(), maxsize: self.queue.maxsize(), pq }
    }

    fn pop(&self) -> Option<QueueItem> {
        let item = self.queue.pop()?;
        Some(QueueItem { priority: 0, item: serde_json::to_value(item).unwrap_or(serde_json::Value::Null) })
    }

    fn push(&self, item: QueueItem) -> Result<(), QueueError> {
        let task: T = serde_json::from_value(item.item)
            .map_err(|e| QueueError::InvalidItem(e.to_string()))?;
        self.queue.push(item.priority, task)
    }
}

/// One external service the `/health` endpoint probes for reachability.
pub struct ServiceHealth {
    pub name: &'static str,
    pub host: String,
    pub port: u16,
    pub client: Arc<dyn HttpClient>,
}

/// Registry of every live queue, keyed by scheduler id (`{kind}-{org}`).
/// The supervisor registers/deregisters entries as schedulers come and go;
/// admin handlers only ever read through [`AdminQueue`]'s narrow interface.
#[derive(Default)]
pub struct AdminState {
    queues: DashMap<String, Arc<dyn AdminQueue>>,
    services: Vec<ServiceHealth>,
}

impl AdminState {
    pub fn new() -> Self {
        Self { queues: DashMap::new(), services: Vec::new() }
    }

    pub fn with_services(services: Vec<ServiceHealth>) -> Self {
        Self { queues: DashMap::new(), services }
    }

    /// Per-service reachability (§7: health endpoint reports per-service
    /// reachability), checked via the same TCP probe as the startup
    /// health-check.
    pub async fn check_services(&self) -> Vec<(&'static str, bool)> {
        let mut results = Vec::with_capacity(self.services.len());
        for service in &self.services {
            let healthy = service.client.is_host_available(&service.host, service.port).await;
            results.push((service.name, healthy));
        }
        results
    }

    pub fn register<T>(&self, id: impl Into<String>, queue: Arc<PriorityQueue<T>>)
    where
        T: HasIdentity + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let id = id.into();
        self.queues.insert(id.clone(), Arc::new(NamedQueue { id, queue }));
    }

    pub fn deregister(&self, id: &str) {
        self.queues.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AdminQueue>> {
        self.queues.get(id).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<QueueView> {
        let mut views: Vec<QueueView> =
            self.queues.iter().map(|entry| entry.value().view()).collect();
        views.sort_by(|a, b| a.id.cmp(&b.id));
        views
    }
}
