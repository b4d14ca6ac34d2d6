//! Populates a boefje queue from scan-profile events, a poll of recently
//! mutated OOIs, and random fill, enforcing the enabled/scan-level/
//! grace-period gates from I4.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex as SyncMutex;
use tracing::{debug, warn};

use super::PopulatePolicy;
use crate::domain::{BoefjeTask, Ooi, Organisation, Plugin};
use crate::listener::Listener;
use crate::queue::PriorityQueue;
use crate::ranker::BoefjeRanker;
use crate::services::{CatalogueClient, InventoryClient, RawDataClient};

pub struct BoefjeSchedulerConfig {
    pub random_fill_n: u32,
    pub mutation_window: Duration,
    pub grace_period: Duration,
}

impl Default for BoefjeSchedulerConfig {
    fn default() -> Self {
        Self {
            random_fill_n: 50,
            mutation_window: Duration::from_secs(60),
            grace_period: Duration::from_secs(86_400),
        }
    }
}

pub struct BoefjeScheduler {
    organisation: Organisation,
    queue: Arc<PriorityQueue<BoefjeTask>>,
    catalogue: Arc<CatalogueClient>,
    inventory: Arc<InventoryClient>,
    rawdata: Arc<RawDataClient>,
    scan_profile_events: SyncMutex<Listener<Ooi>>,
    config: BoefjeSchedulerConfig,
}

impl BoefjeScheduler {
    pub fn new(
        organisation: Organisation,
        queue: Arc<PriorityQueue<BoefjeTask>>,
        catalogue: Arc<CatalogueClient>,
        inventory: Arc<InventoryClient>,
        rawdata: Arc<RawDataClient>,
        scan_profile_events: Listener<Ooi>,
        config: BoefjeSchedulerConfig,
    ) -> Self {
        Self {
            organisation,
            queue,
            catalogue,
            inventory,
            rawdata,
            scan_profile_events: SyncMutex::new(scan_profile_events),
            config,
        }
    }

    pub fn queue(&self) -> &Arc<PriorityQueue<BoefjeTask>> {
        &self.queue
    }

    /// One populate tick: gathers candidate OOIs from each source in
    /// order, stopping once the queue is full or sources are exhausted
    /// (§4.5). Returns the number of tasks pushed.
    pub async fn populate_queue(&self) -> usize {
        let mut pushed = 0;

        let event_driven = self.scan_profile_events.lock().drain();
        pushed += self.create_and_push(&event_driven).await;
        if self.queue_is_full() {
            return pushed;
        }

        let since = Utc::now() - ChronoDuration::from_std(self.config.mutation_window).unwrap_or_default();
        match self.inventory.objects_modified_since(&self.organisation.id, since).await {
            Ok(oois) => {
                pushed += self.create_and_push(&oois).await;
            }
            Err(err) => warn!(org = %self.organisation.id, %err, "mutation-poll failed, skipping this tick"),
        }
        if self.queue_is_full() {
            return pushed;
        }

        match self.inventory.random_objects(&self.organisation.id, self.config.random_fill_n).await {
            Ok(oois) => {
                pushed += self.create_and_push(&oois).await;
            }
            Err(err) => warn!(org = %self.organisation.id, %err, "random-fill failed, skipping this tick"),
        }

        pushed
    }

    fn queue_is_full(&self) -> bool {
        let maxsize = self.queue.maxsize();
        maxsize != 0 && self.queue.len() >= maxsize
    }

    async fn create_and_push(&self, oois: &[Ooi]) -> usize {
        let mut pushed = 0;
        for ooi in oois {
            if self.queue_is_full() {
                break;
            }
            for (priority, task) in self.create_tasks_for_ooi(ooi).await {
                match self.queue.push(priority, task) {
                    Ok(()) => pushed += 1,
                    Err(_) => break, // queue full: stop pushing this tick, no error surfaced
                }
            }
        }
        pushed
    }

    /// §4.5: for each boefje matching the OOI's type, apply the
    /// plugin-resolution, enabled, scan-level, and grace-period gates.
    pub async fn create_tasks_for_ooi(&self, ooi: &Ooi) -> Vec<(i64, BoefjeTask)> {
        let boefjes = match self.catalogue.boefjes_for_ooi_type(&self.organisation.id, &ooi.ooi_type).await {
            Ok(boefjes) => boefjes,
            Err(err) => {
                warn!(org = %self.organisation.id, %err, "plugin lookup failed, skipping ooi this tick");
                return Vec::new();
            }
        };

        let mut items = Vec::new();
        for boefje in boefjes {
            if let Some(task) = self.try_build_task(&boefje, ooi).await {
                items.push(task);
            }
        }
        items
    }

    async fn try_build_task(&self, boefje: &Plugin, ooi: &Ooi) -> Option<(i64, BoefjeTask)> {
        if !boefje.enabled {
            debug!(boefje = %boefje.id, "skipped: plugin disabled");
            return None;
        }
        if ooi.scan_profile.level < boefje.scan_level {
            debug!(boefje = %boefje.id, ooi = %ooi.primary_key, "skipped: scan level too low");
            return None;
        }

        match self.rawdata.last_run(&boefje.id, &ooi.primary_key).await {
            Ok(Some(meta)) => {
                let elapsed = Utc::now() - meta.ended_at;
                if elapsed < ChronoDuration::from_std(self.config.grace_period).unwrap_or_default() {
                    debug!(boefje = %boefje.id, ooi = %ooi.primary_key, "skipped: within grace period");
                    return None;
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(boefje = %boefje.id, %err, "grace-period lookup failed, skipping ooi this tick");
                return None;
            }
        }

        let task = BoefjeTask::new(boefje.clone(), ooi.primary_key.clone(), self.organisation.id.clone());
        let priority = BoefjeRanker::rank(ooi.scan_profile.level, ooi, Utc::now());
        Some((priority, task))
    }
}

impl PopulatePolicy for BoefjeScheduler {
    fn populate_tick(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let pushed = self.populate_queue().await;
            debug!(org = %self.organisation.id, pushed, "boefje populate tick complete");
        })
    }
}
