//! Drains a queue of items meeting a priority threshold and hands them
//! to the remote worker fabric, retrying transient failures with backoff.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, warn};

use crate::domain::DispatchTask;
use crate::queue::PriorityQueue;
use crate::retry::RetryPolicy;
use crate::services::{Broker, DispatchMessage};

/// Drains `queue`, dispatching items with `priority <= threshold` to
/// `broker`. Items failing validation or exhausting retries are dropped
/// (at-most-once, §4.3) rather than re-enqueued.
pub struct Dispatcher<T: DispatchTask + Serialize + Clone> {
    queue: Arc<PriorityQueue<T>>,
    broker: Arc<dyn Broker>,
    retry_policy: RetryPolicy,
    threshold: AtomicI64,
}

impl<T: DispatchTask + Serialize + Clone> Dispatcher<T> {
    pub fn new(queue: Arc<PriorityQueue<T>>, broker: Arc<dyn Broker>) -> Self {
        Self {
            queue,
            broker,
            retry_policy: RetryPolicy::dispatcher_default(),
            threshold: AtomicI64::new(i64::MAX),
        }
    }

    /// Backpressure knob: lowering the threshold restricts dispatch to
    /// higher-priority (numerically smaller) items only.
    pub fn set_threshold(&self, threshold: i64) {
        self.threshold.store(threshold, Ordering::SeqCst);
    }

    pub fn threshold(&self) -> i64 {
        self.threshold.load(Ordering::SeqCst)
    }

    /// One step of the dispatch loop: peek the top item, and if it meets
    /// the threshold, pop and dispatch it. Returns `true` if an item was
    /// dispatched this step.
    pub async fn step(&self) -> bool {
        let threshold = self.threshold();
        let top_priority = match self.queue.snapshot().into_iter().next() {
            Some((priority, _)) => priority,
            None => return false,
        };
        if top_priority > threshold {
            return false;
        }
        let Some(item) = self.queue.pop() else { return false };
        self.dispatch(item).await;
        true
    }

    /// Serialise and enqueue one item on the remote worker fabric,
    /// retrying with the dispatcher's backoff policy on failure.
    async fn dispatch(&self, item: T) {
        let message = match DispatchMessage::for_task(&item) {
            Ok(message) => message,
            Err(err) => {
                error!(%err, "dropping task that failed to serialise");
                return;
            }
        };

        let mut attempt = 1;
        loop {
            match self.broker.enqueue(&message).await {
                Ok(()) => return,
                Err(err) => {
                    let Some(delay) = self.retry_policy.delay_for_attempt(attempt) else {
                        error!(%err, task_id = %message.task_id, attempt, "dropping task after exhausting retries");
                        return;
                    };
                    warn!(%err, task_id = %message.task_id, attempt, ?delay, "retrying dispatch");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
