//! Command-line entrypoint for the KAT task scheduler daemon: wires the
//! service clients, starts the supervisor and the admin HTTP server, and
//! waits for a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kat_scheduler_core::admin::{self, AdminState, ServiceHealth};
use kat_scheduler_core::config::Config;
use kat_scheduler_core::services::{
    CatalogueClient, HttpBroker, HttpClient, InventoryClient, RawDataClient, ReqwestClient,
};
use kat_scheduler_core::{SchedulerError, Supervisor};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// KAT scheduler daemon: per-organisation boefje/normalizer task scheduling.
#[derive(Parser, Debug)]
#[command(name = "kat-scheduler", version, about)]
struct Args {
    /// Admin API bind host. Overrides API_HOST.
    #[arg(long, env = "API_HOST")]
    api_host: Option<String>,

    /// Admin API bind port. Overrides API_PORT.
    #[arg(long, env = "API_PORT")]
    api_port: Option<u16>,

    /// Remote worker fabric broker URL. Overrides DSP_BROKER_URL.
    #[arg(long, env = "DSP_BROKER_URL")]
    broker_url: Option<String>,

    /// Per-queue capacity. Overrides PQ_MAXSIZE.
    #[arg(long, env = "PQ_MAXSIZE")]
    pq_maxsize: Option<usize>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        error!(%err, "scheduler exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), SchedulerError> {
    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(host) = args.api_host.clone() {
        config = config.with_api_bind(host, config.api_port);
    }
    if let Some(port) = args.api_port {
        config = config.with_api_bind(config.api_host.clone(), port);
    }
    if let Some(url) = args.broker_url {
        config = config.with_broker_url(url);
    }
    if let Some(maxsize) = args.pq_maxsize {
        config = config.with_pq_maxsize(maxsize);
    }

    let katalogus_client: Arc<dyn HttpClient> =
        Arc::new(ReqwestClient::new("katalogus", config.katalogus.timeout));
    let octopoes_client: Arc<dyn HttpClient> =
        Arc::new(ReqwestClient::new("octopoes", config.octopoes.timeout));
    let bytes_client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new("bytes", config.bytes.timeout));
    let broker_client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new("broker", Duration::from_secs(5)));

    let catalogue = Arc::new(CatalogueClient::new(katalogus_client.clone(), config.katalogus.base_url.clone()));
    let inventory = Arc::new(InventoryClient::new(octopoes_client.clone(), config.octopoes.base_url.clone()));
    let rawdata = Arc::new(RawDataClient::new(
        bytes_client.clone(),
        config.bytes.base_url.clone(),
        config.bytes.user.clone(),
        config.bytes.pass.clone(),
    ));
    let broker = Arc::new(HttpBroker::new(broker_client, config.dsp_broker_url.clone()));

    info!("waiting for external services to become reachable");
    catalogue
        .wait_until_healthy(&config.katalogus.host, config.katalogus.port, config.health_check_interval)
        .await?;
    inventory
        .wait_until_healthy(&config.octopoes.host, config.octopoes.port, config.health_check_interval)
        .await?;
    rawdata
        .wait_until_healthy(&config.bytes.host, config.bytes.port, config.health_check_interval)
        .await?;

    let admin_state = Arc::new(AdminState::with_services(vec![
        ServiceHealth {
            name: "katalogus",
            host: config.katalogus.host.clone(),
            port: config.katalogus.port,
            client: katalogus_client,
        },
        ServiceHealth {
            name: "octopoes",
            host: config.octopoes.host.clone(),
            port: config.octopoes.port,
            client: octopoes_client,
        },
        ServiceHealth { name: "bytes", host: config.bytes.host.clone(), port: config.bytes.port, client: bytes_client },
    ]));

    let supervisor = Arc::new(Supervisor::new(
        config.clone(),
        catalogue,
        inventory,
        rawdata,
        broker,
        admin_state.clone(),
    ));
    supervisor.start().await?;
    supervisor.clone().run_monitor();
    info!("supervisor started");

    let bind = format!("{}:{}", config.api_host, config.api_port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| SchedulerError::Config(format!("failed to bind admin API on {bind}: {e}")))?;
    info!(%bind, "admin API listening");
    let server = axum::serve(listener, admin::router(admin_state));

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| SchedulerError::Config(format!("failed to install signal handler: {e}")))?;

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                error!(%err, "admin server terminated unexpectedly");
            }
        }
        _ = shutdown.cancelled() => {
            info!("shutdown signal received");
        }
    }

    supervisor.shutdown().await;
    info!("supervisor stopped, exiting");
    Ok(())
}
