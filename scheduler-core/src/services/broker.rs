//! Client for the remote worker fabric's message-broker RPC (§6.2).

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use super::error::ServiceError;
use super::http::HttpClient;
use crate::domain::DispatchTask;

/// Canonical enqueue message: `{name, args: [task], queue, task_id}`.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DispatchMessage {
    pub name: &'static str,
    pub args: [Value; 1],
    pub queue: &'static str,
    pub task_id: String,
}

impl DispatchMessage {
    pub fn for_task<T: DispatchTask + Serialize>(task: &T) -> Result<Self, ServiceError> {
        let payload = serde_json::to_value(task).map_err(|e| ServiceError::Http {
            service: "broker",
            status: 0,
            detail: format!("task serialisation failed: {e}"),
        })?;
        Ok(Self {
            name: task.handler_name(),
            args: [payload],
            queue: task.queue_name(),
            task_id: task.task_id().to_string(),
        })
    }
}

#[async_trait]
pub trait Broker: Send + Sync {
    async fn enqueue(&self, message: &DispatchMessage) -> Result<(), ServiceError>;
}

/// Production broker client: POSTs the canonical message to the
/// message-broker's HTTP RPC frontend.
pub struct HttpBroker {
    client: std::sync::Arc<dyn HttpClient>,
    url: String,
}

impl HttpBroker {
    pub fn new(client: std::sync::Arc<dyn HttpClient>, broker_url: impl Into<String>) -> Self {
        Self { client, url: broker_url.into() }
    }
}

#[async_trait]
impl Broker for HttpBroker {
    async fn enqueue(&self, message: &DispatchMessage) -> Result<(), ServiceError> {
        let body = serde_json::to_value(message).map_err(|e| ServiceError::Http {
            service: "broker",
            status: 0,
            detail: e.to_string(),
        })?;
        self.client.post_json(&self.url, &body, None).await?;
        Ok(())
    }
}

/// Records every enqueue attempt in order, for dispatcher tests (S8).
#[derive(Default)]
pub struct RecordingBroker {
    pub sent: Mutex<Vec<DispatchMessage>>,
    pub fail_next: Mutex<u32>,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail_next: Mutex::new(0) }
    }

    /// Make the next `n` enqueue calls fail, to exercise the dispatcher's
    /// retry-then-drop path.
    pub fn fail_next_n(&self, n: u32) {
        *self.fail_next.lock() = n;
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn enqueue(&self, message: &DispatchMessage) -> Result<(), ServiceError> {
        let mut remaining = self.fail_next.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(ServiceError::Unreachable { service: "broker", detail: "simulated failure".into() });
        }
        drop(remaining);
        self.sent.lock().push(message.clone());
        Ok(())
    }
}
