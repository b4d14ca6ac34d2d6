//! Fleet-management control loop (§4.7): discovers organisations,
//! instantiates a boefje + normalizer scheduler pair per organisation,
//! and reconciles that fleet against the catalogue's organisation list on
//! every monitor tick.
//!
//! The source's `monitor_organisations` swaps the set-difference operands
//! (additions computed as `current − desired`, removals as `desired −
//! current`); per §9's open question this is corrected here: `removals =
//! current − desired`, `additions = desired − current`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::SchedulerError;
use crate::admin::AdminState;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::domain::{BoefjeTask, NormalizerTask, Ooi, Organisation, RawDataRef};
use crate::listener::Listener;
use crate::queue::PriorityQueue;
use crate::scheduler::{BoefjeScheduler, BoefjeSchedulerConfig, NormalizerScheduler, SchedulerRuntime};
use crate::services::{Broker, CatalogueClient, InventoryClient, RawDataClient};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const MONITOR_STOP_GRACE: Duration = Duration::from_secs(5);

/// Everything spun up for one organisation: both scheduler runtimes plus
/// the sending halves of their event channels, handed to whatever bridges
/// the real event bus subscriptions (outside this crate, §1).
struct OrgHandle {
    boefje_runtime: Arc<SchedulerRuntime<BoefjeTask>>,
    normalizer_runtime: Arc<SchedulerRuntime<NormalizerTask>>,
    scan_profile_tx: mpsc::Sender<Ooi>,
    raw_data_tx: mpsc::Sender<RawDataRef>,
}

/// Lifecycle owner for the whole scheduling engine: owns the shared
/// service clients, the admin-visible queue registry, and one `OrgHandle`
/// per active tenant.
pub struct Supervisor {
    config: Config,
    catalogue: Arc<CatalogueClient>,
    inventory: Arc<InventoryClient>,
    rawdata: Arc<RawDataClient>,
    broker: Arc<dyn Broker>,
    admin: Arc<AdminState>,
    orgs: dashmap::DashMap<String, OrgHandle>,
    monitor_cancellation: CancellationToken,
    monitor_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    pub fn new(
        config: Config,
        catalogue: Arc<CatalogueClient>,
        inventory: Arc<InventoryClient>,
        rawdata: Arc<RawDataClient>,
        broker: Arc<dyn Broker>,
        admin: Arc<AdminState>,
    ) -> Self {
        Self {
            config,
            catalogue,
            inventory,
            rawdata,
            broker,
            admin,
            orgs: dashmap::DashMap::new(),
            monitor_cancellation: CancellationToken::new(),
            monitor_handle: std::sync::Mutex::new(None),
        }
    }

    pub fn admin_state(&self) -> &Arc<AdminState> {
        &self.admin
    }

    pub fn organisation_ids(&self) -> Vec<String> {
        self.orgs.iter().map(|e| e.key().clone()).collect()
    }

    /// Startup (§4.7): discover organisations and create both schedulers
    /// for each. A single organisation failing to list is fatal (the
    /// catalogue itself is unreachable); per-organisation creation never
    /// fails since it performs no remote calls of its own.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let orgs = self.catalogue.list_organisations().await?;
        for org in orgs {
            self.create_org(org);
        }
        Ok(())
    }

    /// Wires a fresh boefje + normalizer scheduler pair for `org`, starts
    /// both loops, and registers their queues with the admin surface.
    fn create_org(&self, org: Organisation) {
        let boefje_queue: Arc<PriorityQueue<BoefjeTask>> = Arc::new(PriorityQueue::new(self.config.pq_maxsize));
        let boefje_dispatcher = Arc::new(Dispatcher::new(boefje_queue.clone(), self.broker.clone()));
        let (scan_profile_tx, scan_profile_listener) = Listener::channel("scan_profile", EVENT_CHANNEL_CAPACITY);
        let boefje_scheduler = Arc::new(BoefjeScheduler::new(
            org.clone(),
            boefje_queue.clone(),
            self.catalogue.clone(),
            self.inventory.clone(),
            self.rawdata.clone(),
            scan_profile_listener,
            BoefjeSchedulerConfig {
                random_fill_n: self.config.random_fill_n,
                mutation_window: self.config.pq_populate_interval,
                grace_period: self.config.pq_populate_grace_period,
            },
        ));
        let boefje_id = org.scheduler_id("boefje");
        let boefje_runtime = Arc::new(
            SchedulerRuntime::new(boefje_id.clone(), boefje_queue.clone(), boefje_dispatcher)
                .with_populate_interval(self.config.pq_populate_interval),
        );
        boefje_runtime.run(boefje_scheduler);
        self.admin.register(boefje_id, boefje_queue);

        let normalizer_queue: Arc<PriorityQueue<NormalizerTask>> =
            Arc::new(PriorityQueue::new(self.config.pq_maxsize));
        let normalizer_dispatcher = Arc::new(Dispatcher::new(normalizer_queue.clone(), self.broker.clone()));
        let (raw_data_tx, raw_data_listener) = Listener::channel("raw_data_ready", EVENT_CHANNEL_CAPACITY);
        let normalizer_scheduler = Arc::new(NormalizerScheduler::new(
            org.clone(),
            normalizer_queue.clone(),
            self.catalogue.clone(),
            raw_data_listener,
        ));
        let normalizer_id = org.scheduler_id("normalizer");
        let normalizer_runtime = Arc::new(
            SchedulerRuntime::new(normalizer_id.clone(), normalizer_queue.clone(), normalizer_dispatcher)
                .with_populate_interval(self.config.pq_populate_interval),
        );
        normalizer_runtime.run(normalizer_scheduler);
        self.admin.register(normalizer_id, normalizer_queue);

        info!(org = %org.id, "organisation schedulers started");
        self.orgs.insert(org.id.clone(), OrgHandle { boefje_runtime, normalizer_runtime, scan_profile_tx, raw_data_tx });
    }

    /// Stops and deregisters both schedulers for `org_id`, if present.
    async fn stop_org(&self, org_id: &str) {
        let Some((_, handle)) = self.orgs.remove(org_id) else { return };
        handle.boefje_runtime.stop().await;
        handle.normalizer_runtime.stop().await;
        self.admin.deregister(handle.boefje_runtime.id());
        self.admin.deregister(handle.normalizer_runtime.id());
        info!(org = %org_id, "organisation schedulers stopped");
    }

    /// One reconciliation tick (§4.7): removals for orgs that disappeared
    /// from the catalogue, additions for orgs newly present. A catalogue
    /// read failure abandons this tick and keeps the existing fleet alive
    /// (§7: "Unreachable during a populate tick → abandon this tick").
    pub async fn monitor_organisations(&self) {
        let orgs = match self.catalogue.list_organisations().await {
            Ok(orgs) => orgs,
            Err(err) => {
                warn!(%err, "organisation list unavailable, skipping this monitor tick");
                return;
            }
        };

        let desired: HashSet<String> = orgs.iter().map(|o| o.id.clone()).collect();
        let current: HashSet<String> = self.organisation_ids().into_iter().collect();

        let removals: Vec<String> = current.difference(&desired).cloned().collect();
        for org_id in removals {
            self.stop_org(&org_id).await;
        }

        let additions: Vec<Organisation> =
            orgs.into_iter().filter(|o| !current.contains(&o.id)).collect();
        for org in additions {
            self.create_org(org);
        }
    }

    /// Starts the hourly monitor loop (§5). Call on an `Arc<Supervisor>`
    /// so the spawned task can outlive the caller's stack frame.
    pub fn run_monitor(self: Arc<Self>) {
        let token = self.monitor_cancellation.clone();
        let interval = self.config.monitor_interval;
        let supervisor = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // first tick fires immediately; skip it, start() already ran once
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => supervisor.monitor_organisations().await,
                }
            }
            info!("monitor loop stopped");
        });
        *self.monitor_handle.lock().expect("monitor_handle mutex poisoned") = Some(handle);
    }

    /// Graceful shutdown (§4.7/§5): stop every organisation's schedulers,
    /// then the monitor loop itself, each within its own grace period.
    pub async fn shutdown(&self) {
        self.monitor_cancellation.cancel();
        let handle = self.monitor_handle.lock().expect("monitor_handle mutex poisoned").take();
        if let Some(handle) = handle {
            if tokio::time::timeout(MONITOR_STOP_GRACE, handle).await.is_err() {
                error!("monitor loop did not stop within grace period");
            }
        }

        let org_ids = self.organisation_ids();
        for org_id in org_ids {
            self.stop_org(&org_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{MockHttpClient, RecordingBroker};
    use serde_json::json;

    fn supervisor_with_orgs(orgs: serde_json::Value) -> (Arc<Supervisor>, Arc<MockHttpClient>) {
        let mock = Arc::new(MockHttpClient::new());
        mock.set_response("http://katalogus/v1/organisations", orgs);
        let catalogue = Arc::new(CatalogueClient::new(mock.clone(), "http://katalogus"));
        let inventory = Arc::new(InventoryClient::new(mock.clone(), "http://octopoes"));
        let rawdata = Arc::new(RawDataClient::new(mock.clone(), "http://bytes", "user", "pass"));
        let broker = Arc::new(RecordingBroker::new());
        let admin = Arc::new(AdminState::new());
        let config = Config::default().with_pq_maxsize(10);
        let supervisor = Arc::new(Supervisor::new(config, catalogue, inventory, rawdata, broker, admin));
        (supervisor, mock)
    }

    #[tokio::test]
    async fn test_start_creates_both_schedulers_per_organisation() {
        let (supervisor, _mock) =
            supervisor_with_orgs(json!([{"id": "acme", "name": "Acme"}]));

        supervisor.start().await.unwrap();

        assert_eq!(supervisor.organisation_ids(), vec!["acme".to_string()]);
        assert!(supervisor.admin_state().get("boefje-acme").is_some());
        assert!(supervisor.admin_state().get("normalizer-acme").is_some());
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_s10_org_churn_across_monitor_ticks() {
        let (supervisor, mock) = supervisor_with_orgs(json!([{"id": "a", "name": "A"}]));
        supervisor.start().await.unwrap();
        assert_eq!(supervisor.organisation_ids(), vec!["a".to_string()]);

        // t1: catalogue now reports {A, B} -> B's schedulers are created.
        mock.set_response(
            "http://katalogus/v1/organisations",
            json!([{"id": "a", "name": "A"}, {"id": "b", "name": "B"}]),
        );
        supervisor.monitor_organisations().await;
        let mut ids = supervisor.organisation_ids();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert!(supervisor.admin_state().get("boefje-b").is_some());
        assert!(supervisor.admin_state().get("normalizer-b").is_some());

        // t2: catalogue now reports {B} only -> A's schedulers are stopped.
        mock.set_response("http://katalogus/v1/organisations", json!([{"id": "b", "name": "B"}]));
        supervisor.monitor_organisations().await;
        assert_eq!(supervisor.organisation_ids(), vec!["b".to_string()]);
        assert!(supervisor.admin_state().get("boefje-a").is_none());
        assert!(supervisor.admin_state().get("normalizer-a").is_none());

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_monitor_tick_survives_catalogue_unreachable() {
        let (supervisor, mock) = supervisor_with_orgs(json!([{"id": "a", "name": "A"}]));
        supervisor.start().await.unwrap();

        mock.set_error("http://katalogus/v1/organisations", "connection refused");
        supervisor.monitor_organisations().await;

        // Fleet is untouched; the tick was abandoned, not a crash.
        assert_eq!(supervisor.organisation_ids(), vec!["a".to_string()]);
        supervisor.shutdown().await;
    }
}
