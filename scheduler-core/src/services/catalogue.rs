//! Plugin catalogue ("katalogus") client: organisations and plugins,
//! each dimension cached independently with its own TTL.

use std::sync::Arc;
use std::time::Duration;

use super::cache::TtlCache;
use super::error::{CacheLookup, ServiceError};
use super::health::wait_until_healthy;
use super::http::{get_as, HttpClient};
use crate::domain::{Organisation, Plugin};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

pub struct CatalogueClient {
    client: Arc<dyn HttpClient>,
    base_url: String,
    plugins_by_org: TtlCache<String, Vec<Plugin>>,
    boefjes_by_ooi_type: TtlCache<(String, String), Vec<Plugin>>,
    normalizers_by_mime_type: TtlCache<(String, String), Vec<Plugin>>,
}

impl CatalogueClient {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            plugins_by_org: TtlCache::new(DEFAULT_CACHE_TTL),
            boefjes_by_ooi_type: TtlCache::new(DEFAULT_CACHE_TTL),
            normalizers_by_mime_type: TtlCache::new(DEFAULT_CACHE_TTL),
        }
    }

    pub async fn wait_until_healthy(&self, host: &str, port: u16, interval: Duration) -> Result<(), ServiceError> {
        wait_until_healthy(self.client.as_ref(), "katalogus", host, port, &self.base_url, interval).await
    }

    pub async fn list_organisations(&self) -> Result<Vec<Organisation>, ServiceError> {
        let url = format!("{}/v1/organisations", self.base_url);
        get_as(self.client.as_ref(), &url, None).await
    }

    pub async fn get_organisation(&self, id: &str) -> Result<Organisation, ServiceError> {
        let url = format!("{}/v1/organisations/{id}", self.base_url);
        get_as(self.client.as_ref(), &url, None).await
    }

    /// All plugins for an organisation. Refreshes on cache miss or
    /// expiry, retrying once after the refresh per the caller contract
    /// described for `Expired` in the error-handling design.
    pub async fn plugins_for_org(&self, org_id: &str) -> Result<Vec<Plugin>, ServiceError> {
        if let CacheLookup::Hit(plugins) = self.plugins_by_org.get(&org_id.to_string()).await {
            return Ok(plugins);
        }
        let url = format!("{}/v1/organisations/{org_id}/plugins", self.base_url);
        let plugins: Vec<Plugin> = get_as(self.client.as_ref(), &url, None).await?;
        self.plugins_by_org.insert(org_id.to_string(), plugins.clone()).await;
        Ok(plugins)
    }

    /// Boefje plugins for `org_id` whose `consumes` matches `ooi_type`.
    pub async fn boefjes_for_ooi_type(
        &self,
        org_id: &str,
        ooi_type: &str,
    ) -> Result<Vec<Plugin>, ServiceError> {
        let key = (org_id.to_string(), ooi_type.to_string());
        if let CacheLookup::Hit(plugins) = self.boefjes_by_ooi_type.get(&key).await {
            return Ok(plugins);
        }
        let all = self.plugins_for_org(org_id).await?;
        let matching: Vec<Plugin> = all
            .into_iter()
            .filter(|p| p.plugin_type == crate::domain::PluginType::Boefje && p.consumes.matches(ooi_type))
            .collect();
        self.boefjes_by_ooi_type.insert(key, matching.clone()).await;
        Ok(matching)
    }

    /// Normalizer plugins for `org_id` whose `consumes` set includes `mime_type`.
    pub async fn normalizers_for_mime_type(
        &self,
        org_id: &str,
        mime_type: &str,
    ) -> Result<Vec<Plugin>, ServiceError> {
        let key = (org_id.to_string(), mime_type.to_string());
        if let CacheLookup::Hit(plugins) = self.normalizers_by_mime_type.get(&key).await {
            return Ok(plugins);
        }
        let all = self.plugins_for_org(org_id).await?;
        let matching: Vec<Plugin> = all
            .into_iter()
            .filter(|p| p.plugin_type == crate::domain::PluginType::Normalizer && p.consumes.matches(mime_type))
            .collect();
        self.normalizers_by_mime_type.insert(key, matching.clone()).await;
        Ok(matching)
    }
}
