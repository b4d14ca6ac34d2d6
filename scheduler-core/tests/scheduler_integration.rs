//! End-to-end coverage across the module boundaries unit tests don't
//! cross: populate -> queue -> dispatch for a boefje scheduler, and
//! organisation churn for the supervisor.

use std::sync::Arc;
use std::time::Duration;

use kat_scheduler_core::admin::AdminState;
use kat_scheduler_core::app::Supervisor;
use kat_scheduler_core::config::Config;
use kat_scheduler_core::dispatcher::Dispatcher;
use kat_scheduler_core::domain::BoefjeTask;
use kat_scheduler_core::queue::PriorityQueue;
use kat_scheduler_core::scheduler::{BoefjeScheduler, BoefjeSchedulerConfig, SchedulerRuntime};
use kat_scheduler_core::services::{
    CatalogueClient, HttpClient, InventoryClient, MockHttpClient, RawDataClient, RecordingBroker,
};
use serde_json::json;

fn mock_with_one_org_one_boefje() -> Arc<MockHttpClient> {
    let mock = Arc::new(MockHttpClient::new());
    mock.set_response(
        "http://katalogus/v1/organisations/acme/plugins",
        json!([{"id": "dns-scan", "type": "boefje", "enabled": true, "scan_level": 0, "consumes": "Hostname"}]),
    );
    mock.set_response(
        "http://octopoes/objects/random?organisation_id=acme&n=5",
        json!([{"primary_key": "Hostname|example.com", "ooi_type": "Hostname", "scan_profile": {"level": 1}}]),
    );
    mock.set_response(
        "http://bytes/bytes/boefje_meta?boefje_id=dns-scan&input_ooi=Hostname|example.com&limit=1&descending=true",
        json!([]),
    );
    mock
}

#[tokio::test]
async fn test_populate_then_dispatch_reaches_the_broker() {
    let mock: Arc<dyn HttpClient> = mock_with_one_org_one_boefje();
    let org = kat_scheduler_core::domain::Organisation { id: "acme".into(), name: "Acme".into() };
    let catalogue = Arc::new(CatalogueClient::new(mock.clone(), "http://katalogus"));
    let inventory = Arc::new(InventoryClient::new(mock.clone(), "http://octopoes"));
    let rawdata = Arc::new(RawDataClient::new(mock, "http://bytes", "user", "pass"));

    let queue: Arc<PriorityQueue<BoefjeTask>> = Arc::new(PriorityQueue::new(10));
    let broker = Arc::new(RecordingBroker::new());
    let dispatcher = Arc::new(Dispatcher::new(queue.clone(), broker.clone()));

    let (_tx, listener) = kat_scheduler_core::listener::Listener::channel("scan_profile", 8);
    let scheduler = BoefjeScheduler::new(
        org,
        queue.clone(),
        catalogue,
        inventory,
        rawdata,
        listener,
        BoefjeSchedulerConfig { random_fill_n: 5, mutation_window: Duration::from_secs(60), grace_period: Duration::from_secs(86_400) },
    );

    let pushed = scheduler.populate_queue().await;
    assert_eq!(pushed, 1);
    assert_eq!(queue.len(), 1);

    dispatcher.step().await;

    assert_eq!(queue.len(), 0);
    let sent = broker.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name, "tasks.handle_boefje");
}

#[tokio::test]
async fn test_runtime_drains_populated_tasks_without_manual_stepping() {
    let mock: Arc<dyn HttpClient> = mock_with_one_org_one_boefje();
    let org = kat_scheduler_core::domain::Organisation { id: "acme".into(), name: "Acme".into() };
    let catalogue = Arc::new(CatalogueClient::new(mock.clone(), "http://katalogus"));
    let inventory = Arc::new(InventoryClient::new(mock.clone(), "http://octopoes"));
    let rawdata = Arc::new(RawDataClient::new(mock, "http://bytes", "user", "pass"));

    let queue: Arc<PriorityQueue<BoefjeTask>> = Arc::new(PriorityQueue::new(10));
    let broker = Arc::new(RecordingBroker::new());
    let dispatcher = Arc::new(Dispatcher::new(queue.clone(), broker.clone()));

    let (_tx, listener) = kat_scheduler_core::listener::Listener::channel("scan_profile", 8);
    let scheduler = Arc::new(BoefjeScheduler::new(
        org,
        queue.clone(),
        catalogue,
        inventory,
        rawdata,
        listener,
        BoefjeSchedulerConfig { random_fill_n: 5, mutation_window: Duration::from_secs(60), grace_period: Duration::from_secs(86_400) },
    ));

    let runtime = SchedulerRuntime::new("boefje-acme", queue.clone(), dispatcher)
        .with_populate_interval(Duration::from_millis(10));
    runtime.run(scheduler);

    tokio::time::sleep(Duration::from_millis(100)).await;
    runtime.stop().await;

    assert_eq!(queue.len(), 0);
    assert!(!broker.sent.lock().is_empty());
}

#[tokio::test]
async fn test_supervisor_reconciles_organisation_set_across_ticks() {
    let mock = Arc::new(MockHttpClient::new());
    mock.set_response("http://katalogus/v1/organisations", json!([{"id": "acme", "name": "Acme"}]));
    mock.set_response("http://katalogus/v1/organisations/acme/plugins", json!([]));

    let http: Arc<dyn HttpClient> = mock.clone();
    let catalogue = Arc::new(CatalogueClient::new(http.clone(), "http://katalogus"));
    let inventory = Arc::new(InventoryClient::new(http.clone(), "http://octopoes"));
    let rawdata = Arc::new(RawDataClient::new(http, "http://bytes", "user", "pass"));
    let broker = Arc::new(RecordingBroker::new());
    let admin = Arc::new(AdminState::new());
    let config = Config::default().with_pq_maxsize(10);

    let supervisor = Arc::new(Supervisor::new(config, catalogue, inventory, rawdata, broker, admin.clone()));
    supervisor.start().await.unwrap();
    assert_eq!(supervisor.organisation_ids(), vec!["acme".to_string()]);
    assert!(admin.get("boefje-acme").is_some());

    mock.set_response(
        "http://katalogus/v1/organisations",
        json!([{"id": "acme", "name": "Acme"}, {"id": "globex", "name": "Globex"}]),
    );
    mock.set_response("http://katalogus/v1/organisations/globex/plugins", json!([]));
    supervisor.monitor_organisations().await;

    let mut ids = supervisor.organisation_ids();
    ids.sort();
    assert_eq!(ids, vec!["acme".to_string(), "globex".to_string()]);
    assert!(admin.get("boefje-globex").is_some());

    mock.set_response("http://katalogus/v1/organisations", json!([{"id": "globex", "name": "Globex"}]));
    supervisor.monitor_organisations().await;

    assert_eq!(supervisor.organisation_ids(), vec!["globex".to_string()]);
    assert!(admin.get("boefje-acme").is_none());
    assert!(admin.get("normalizer-acme").is_none());

    supervisor.shutdown().await;
}
