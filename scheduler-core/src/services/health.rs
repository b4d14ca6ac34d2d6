//! Startup health-check: TCP reachability, then an HTTP `/health` probe,
//! each retried a fixed number of times before giving up.

use std::time::Duration;

use tracing::warn;

use super::error::ServiceError;
use super::http::HttpClient;

const HOST_CHECK_ATTEMPTS: u32 = 10;

/// Open TCP to `host:port`, retrying `HOST_CHECK_ATTEMPTS` times `interval`
/// apart, then GET `{base_url}/health` with the same retry budget.
pub async fn wait_until_healthy(
    client: &dyn HttpClient,
    service: &'static str,
    host: &str,
    port: u16,
    base_url: &str,
    interval: Duration,
) -> Result<(), ServiceError> {
    let mut reachable = false;
    for attempt in 1..=HOST_CHECK_ATTEMPTS {
        if client.is_host_available(host, port).await {
            reachable = true;
            break;
        }
        warn!(service, attempt, "host not yet reachable");
        tokio::time::sleep(interval).await;
    }
    if !reachable {
        return Err(ServiceError::Unreachable {
            service,
            detail: format!("{host}:{port} did not become reachable after {HOST_CHECK_ATTEMPTS} attempts"),
        });
    }

    let health_url = format!("{base_url}/health");
    let mut last_err = None;
    for attempt in 1..=HOST_CHECK_ATTEMPTS {
        match client.get_json(&health_url, None).await {
            Ok(_) => return Ok(()),
            Err(err) => {
                warn!(service, attempt, %err, "health probe failed");
                last_err = Some(err);
                tokio::time::sleep(interval).await;
            }
        }
    }
    Err(last_err.unwrap_or(ServiceError::Unreachable {
        service,
        detail: "health probe exhausted retries".into(),
    }))
}
