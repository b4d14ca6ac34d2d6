//! Populates a normalizer queue from raw-data-ready events, fanning out
//! to every normalizer whose declared input type matches.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tracing::{debug, warn};

use super::PopulatePolicy;
use crate::domain::{NormalizerTask, Organisation, RawDataRef};
use crate::listener::Listener;
use crate::queue::PriorityQueue;
use crate::ranker::NormalizerRanker;
use crate::services::CatalogueClient;

pub struct NormalizerScheduler {
    organisation: Organisation,
    queue: Arc<PriorityQueue<NormalizerTask>>,
    catalogue: Arc<CatalogueClient>,
    raw_data_events: SyncMutex<Listener<RawDataRef>>,
}

impl NormalizerScheduler {
    pub fn new(
        organisation: Organisation,
        queue: Arc<PriorityQueue<NormalizerTask>>,
        catalogue: Arc<CatalogueClient>,
        raw_data_events: Listener<RawDataRef>,
    ) -> Self {
        Self { organisation, queue, catalogue, raw_data_events: SyncMutex::new(raw_data_events) }
    }

    pub fn queue(&self) -> &Arc<PriorityQueue<NormalizerTask>> {
        &self.queue
    }

    /// §4.6: for each raw-data-ready event, fan out to every normalizer
    /// whose `consumes` set intersects the event's mime-types.
    pub async fn populate_queue(&self) -> usize {
        let events = self.raw_data_events.lock().drain();
        let mut pushed = 0;
        for raw_data in events {
            for mime_type in &raw_data.mime_types {
                let normalizers = match self
                    .catalogue
                    .normalizers_for_mime_type(&self.organisation.id, mime_type)
                    .await
                {
                    Ok(normalizers) => normalizers,
                    Err(err) => {
                        warn!(org = %self.organisation.id, %err, "normalizer lookup failed, skipping event this tick");
                        continue;
                    }
                };
                for normalizer in normalizers {
                    if !normalizer.enabled {
                        continue;
                    }
                    let task = NormalizerTask::new(normalizer, raw_data.clone(), self.organisation.id.clone());
                    match self.queue.push(NormalizerRanker::rank(), task) {
                        Ok(()) => pushed += 1,
                        Err(_) => return pushed, // queue full: stop silently
                    }
                }
            }
        }
        pushed
    }
}

impl PopulatePolicy for NormalizerScheduler {
    fn populate_tick(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let pushed = self.populate_queue().await;
            debug!(org = %self.organisation.id, pushed, "normalizer populate tick complete");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockHttpClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_fans_out_to_every_matching_normalizer() {
        let mock = Arc::new(MockHttpClient::new());
        mock.set_response(
            "http://katalogus/v1/organisations/acme/plugins",
            json!([
                {"id": "n1", "type": "normalizer", "enabled": true, "scan_level": 0, "consumes": ["text/plain"]},
                {"id": "n2", "type": "normalizer", "enabled": true, "scan_level": 0, "consumes": ["text/plain", "application/json"]},
                {"id": "n3", "type": "normalizer", "enabled": true, "scan_level": 0, "consumes": ["image/png"]},
            ]),
        );
        let org = Organisation { id: "acme".into(), name: "Acme".into() };
        let catalogue = Arc::new(CatalogueClient::new(mock, "http://katalogus"));
        let queue = Arc::new(PriorityQueue::new(0));
        let (tx, listener) = Listener::channel("raw_data_ready", 16);
        tx.send(RawDataRef { id: "raw-1".into(), mime_types: vec!["text/plain".into()] }).await.unwrap();
        let scheduler = NormalizerScheduler::new(org, queue.clone(), catalogue, listener);

        let pushed = scheduler.populate_queue().await;
        assert_eq!(pushed, 2);
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_normalizer_is_skipped() {
        let mock = Arc::new(MockHttpClient::new());
        mock.set_response(
            "http://katalogus/v1/organisations/acme/plugins",
            json!([{"id": "n1", "type": "normalizer", "enabled": false, "scan_level": 0, "consumes": ["text/plain"]}]),
        );
        let org = Organisation { id: "acme".into(), name: "Acme".into() };
        let catalogue = Arc::new(CatalogueClient::new(mock, "http://katalogus"));
        let queue = Arc::new(PriorityQueue::new(0));
        let (tx, listener) = Listener::channel("raw_data_ready", 16);
        tx.send(RawDataRef { id: "raw-1".into(), mime_types: vec!["text/plain".into()] }).await.unwrap();
        let scheduler = NormalizerScheduler::new(org, queue.clone(), catalogue, listener);

        let pushed = scheduler.populate_queue().await;
        assert_eq!(pushed, 0);
    }
}
