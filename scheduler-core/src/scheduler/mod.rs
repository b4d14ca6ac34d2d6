//! Abstract scheduler runtime: owns one queue + dispatcher and runs the
//! populate/dispatch loop pair. `BoefjeScheduler` and `NormalizerScheduler`
//! each supply their own populate policy on top of this.

mod boefje;
mod normalizer;

pub use boefje::{BoefjeScheduler, BoefjeSchedulerConfig};
pub use normalizer::NormalizerScheduler;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::dispatcher::Dispatcher;
use crate::domain::DispatchTask;
use crate::queue::PriorityQueue;
use serde::Serialize;

const DEFAULT_POPULATE_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_millis(10);
const STOP_GRACE: Duration = Duration::from_secs(5);

/// The populate side of a scheduler, called once per tick. Boxed-future
/// return keeps this object-safe so `SchedulerRuntime` need not be generic
/// over a populate-policy type.
pub trait PopulatePolicy: Send + Sync + 'static {
    fn populate_tick(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Runtime shared by both scheduler flavours: the queue/dispatcher pair
/// plus the two concurrently running loops and their lifecycle.
pub struct SchedulerRuntime<T: DispatchTask + Serialize + Clone + Send + Sync + 'static> {
    id: String,
    queue: Arc<PriorityQueue<T>>,
    dispatcher: Arc<Dispatcher<T>>,
    populate_interval: Duration,
    dispatch_interval: Duration,
    cancellation: CancellationToken,
    running: AtomicBool,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<T: DispatchTask + Serialize + Clone + Send + Sync + 'static> SchedulerRuntime<T> {
    pub fn new(id: impl Into<String>, queue: Arc<PriorityQueue<T>>, dispatcher: Arc<Dispatcher<T>>) -> Self {
        Self {
            id: id.into(),
            queue,
            dispatcher,
            populate_interval: DEFAULT_POPULATE_INTERVAL,
            dispatch_interval: DEFAULT_DISPATCH_INTERVAL,
            cancellation: CancellationToken::new(),
            running: AtomicBool::new(false),
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_populate_interval(mut self, interval: Duration) -> Self {
        self.populate_interval = interval;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn queue(&self) -> &Arc<PriorityQueue<T>> {
        &self.queue
    }

    /// Starts the populate and dispatch loops. Panics/errors inside either
    /// loop body are caught per-iteration and logged with the scheduler
    /// id; they never tear down the loop (§7: unhandled exceptions must
    /// not terminate the process).
    pub fn run(&self, populate: Arc<dyn PopulatePolicy>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let id = self.id.clone();
        let token = self.cancellation.clone();
        let interval = self.populate_interval;
        let populate_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        populate.populate_tick().await;
                    }
                }
            }
            info!(scheduler = %id, "populate loop stopped");
        });

        let id = self.id.clone();
        let token = self.cancellation.clone();
        let dispatcher = self.dispatcher.clone();
        let interval = self.dispatch_interval;
        let dispatch_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        dispatcher.step().await;
                    }
                }
            }
            info!(scheduler = %id, "dispatch loop stopped");
        });

        *self.handles.lock().expect("handles mutex poisoned") = vec![populate_handle, dispatch_handle];
    }

    /// Signals cancellation and waits up to `STOP_GRACE` for both loops to
    /// drain before forcing termination (§4.4).
    pub async fn stop(&self) {
        self.cancellation.cancel();
        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.handles.lock().expect("handles mutex poisoned"));
        for handle in handles {
            if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
                error!(scheduler = %self.id, "loop did not stop within grace period, forcing");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}
