//! Inventory ("octopoes") client: fetches OOIs by mutation window or
//! at random, to feed the boefje scheduler's populate policy.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::ServiceError;
use super::health::wait_until_healthy;
use super::http::{get_as, HttpClient};
use crate::domain::Ooi;

pub struct InventoryClient {
    client: Arc<dyn HttpClient>,
    base_url: String,
}

impl InventoryClient {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    pub async fn wait_until_healthy(&self, host: &str, port: u16, interval: Duration) -> Result<(), ServiceError> {
        wait_until_healthy(self.client.as_ref(), "octopoes", host, port, &self.base_url, interval).await
    }

    /// OOIs modified at or after `since` (mutation-poll source, §4.5).
    pub async fn objects_modified_since(&self, org_id: &str, since: DateTime<Utc>) -> Result<Vec<Ooi>, ServiceError> {
        let url = format!(
            "{}/objects?organisation_id={org_id}&modified_since={}",
            self.base_url,
            since.to_rfc3339()
        );
        get_as(self.client.as_ref(), &url, None).await
    }

    /// `n` randomly selected OOIs (random-fill source, §4.5).
    pub async fn random_objects(&self, org_id: &str, n: u32) -> Result<Vec<Ooi>, ServiceError> {
        let url = format!("{}/objects/random?organisation_id={org_id}&n={n}", self.base_url);
        get_as(self.client.as_ref(), &url, None).await
    }
}
