//! Raw-data ("bytes") client: bearer-token auth plus lookup of the most
//! recent completed run of a (boefje, input_ooi) pair, for the
//! grace-period gate.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::ServiceError;
use super::health::wait_until_healthy;
use super::http::{get_as, post_as, HttpClient};

#[derive(Clone, Debug, Deserialize)]
pub struct BoefjeMeta {
    pub ended_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct RawDataClient {
    client: Arc<dyn HttpClient>,
    base_url: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl RawDataClient {
    pub fn new(
        client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            token: RwLock::new(None),
        }
    }

    pub async fn wait_until_healthy(&self, host: &str, port: u16, interval: Duration) -> Result<(), ServiceError> {
        wait_until_healthy(self.client.as_ref(), "bytes", host, port, &self.base_url, interval).await
    }

    async fn authenticate(&self) -> Result<String, ServiceError> {
        if let Some(token) = self.token.read().clone() {
            return Ok(token);
        }
        let url = format!("{}/token", self.base_url);
        let req = TokenRequest { username: &self.username, password: &self.password };
        let resp: TokenResponse = post_as(self.client.as_ref(), &url, &req, None).await?;
        *self.token.write() = Some(resp.access_token.clone());
        Ok(resp.access_token)
    }

    /// Most recent completed run of `(boefje_id, input_ooi)`, newest first
    /// (the grace-period gate only needs the single latest).
    pub async fn last_run(&self, boefje_id: &str, input_ooi: &str) -> Result<Option<BoefjeMeta>, ServiceError> {
        let token = self.authenticate().await?;
        let url = format!(
            "{}/bytes/boefje_meta?boefje_id={boefje_id}&input_ooi={input_ooi}&limit=1&descending=true",
            self.base_url
        );
        let metas: Vec<BoefjeMeta> = get_as(self.client.as_ref(), &url, Some(&token)).await?;
        Ok(metas.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::http::MockHttpClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_last_run_authenticates_then_fetches() {
        let mock = Arc::new(MockHttpClient::new());
        mock.set_response("http://bytes/token", json!({"access_token": "tok-123"}));
        mock.set_response(
            "http://bytes/bytes/boefje_meta?boefje_id=dns-scan&input_ooi=ooi-1&limit=1&descending=true",
            json!([{"ended_at": "2026-07-01T00:00:00Z"}]),
        );
        let client = RawDataClient::new(mock.clone(), "http://bytes", "user", "pass");

        let meta = client.last_run("dns-scan", "ooi-1").await.unwrap();
        assert!(meta.is_some());
        assert_eq!(mock.hit_count("http://bytes/token"), 1);
    }

    #[tokio::test]
    async fn test_no_prior_run_returns_none() {
        let mock = Arc::new(MockHttpClient::new());
        mock.set_response("http://bytes/token", json!({"access_token": "tok-123"}));
        mock.set_response(
            "http://bytes/bytes/boefje_meta?boefje_id=dns-scan&input_ooi=ooi-1&limit=1&descending=true",
            json!([]),
        );
        let client = RawDataClient::new(mock, "http://bytes", "user", "pass");

        let meta = client.last_run("dns-scan", "ooi-1").await.unwrap();
        assert!(meta.is_none());
    }
}
