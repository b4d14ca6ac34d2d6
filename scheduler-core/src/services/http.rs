//! A thin async HTTP abstraction so service adapters can be exercised
//! against a fake in tests without touching the network.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::ServiceError;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<Value, ServiceError>;

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, ServiceError>;

    /// TCP reachability check, used by the startup health-check retry loop.
    async fn is_host_available(&self, host: &str, port: u16) -> bool;
}

/// Production client backed by `reqwest`.
pub struct ReqwestClient {
    inner: reqwest::Client,
    service: &'static str,
}

impl ReqwestClient {
    pub fn new(service: &'static str, timeout: Duration) -> Self {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builder should not fail with static config");
        Self { inner, service }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<Value, ServiceError> {
        let mut req = self.inner.get(url);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(|e| ServiceError::Unreachable {
            service: self.service,
            detail: e.to_string(),
        })?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ServiceError::Auth { service: self.service, detail: "unauthorized".into() });
        }
        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Http {
                service: self.service,
                status: status.as_u16(),
                detail: resp.text().await.unwrap_or_default(),
            });
        }
        resp.json().await.map_err(|e| ServiceError::Http {
            service: self.service,
            status: 0,
            detail: e.to_string(),
        })
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let mut req = self.inner.post(url).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(|e| ServiceError::Unreachable {
            service: self.service,
            detail: e.to_string(),
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Http {
                service: self.service,
                status: status.as_u16(),
                detail: resp.text().await.unwrap_or_default(),
            });
        }
        resp.json().await.map_err(|e| ServiceError::Http {
            service: self.service,
            status: 0,
            detail: e.to_string(),
        })
    }

    async fn is_host_available(&self, host: &str, port: u16) -> bool {
        tokio::net::TcpStream::connect((host, port)).await.is_ok()
    }
}

/// Typed helper: deserialize a GET response body into `T`.
pub async fn get_as<T: DeserializeOwned>(
    client: &dyn HttpClient,
    url: &str,
    bearer: Option<&str>,
) -> Result<T, ServiceError> {
    let value = client.get_json(url, bearer).await?;
    serde_json::from_value(value).map_err(|e| ServiceError::Http {
        service: "unknown",
        status: 0,
        detail: format!("deserialize failure: {e}"),
    })
}

/// Typed helper: POST `body` and deserialize the response into `T`.
pub async fn post_as<B: Serialize + Sync, T: DeserializeOwned>(
    client: &dyn HttpClient,
    url: &str,
    body: &B,
    bearer: Option<&str>,
) -> Result<T, ServiceError> {
    let body = serde_json::to_value(body).map_err(|e| ServiceError::Http {
        service: "unknown",
        status: 0,
        detail: format!("serialize failure: {e}"),
    })?;
    let value = client.post_json(url, &body, bearer).await?;
    serde_json::from_value(value).map_err(|e| ServiceError::Http {
        service: "unknown",
        status: 0,
        detail: format!("deserialize failure: {e}"),
    })
}

/// Scripted in-memory client for unit tests: returns a canned response or
/// error for each exact URL, and tracks how many times each was hit.
#[derive(Default)]
pub struct MockHttpClient {
    responses: parking_lot::Mutex<HashMap<String, Result<Value, String>>>,
    available: parking_lot::Mutex<bool>,
    hits: parking_lot::Mutex<HashMap<String, u32>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: parking_lot::Mutex::new(HashMap::new()),
            available: parking_lot::Mutex::new(true),
            hits: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn set_response(&self, url: impl Into<String>, value: Value) {
        self.responses.lock().insert(url.into(), Ok(value));
    }

    pub fn set_error(&self, url: impl Into<String>, detail: impl Into<String>) {
        self.responses.lock().insert(url.into(), Err(detail.into()));
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    pub fn hit_count(&self, url: &str) -> u32 {
        *self.hits.lock().get(url).unwrap_or(&0)
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get_json(&self, url: &str, _bearer: Option<&str>) -> Result<Value, ServiceError> {
        *self.hits.lock().entry(url.to_string()).or_insert(0) += 1;
        match self.responses.lock().get(url) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(detail)) => {
                Err(ServiceError::Unreachable { service: "mock", detail: detail.clone() })
            }
            None => Err(ServiceError::Http { service: "mock", status: 404, detail: "no stub".into() }),
        }
    }

    async fn post_json(
        &self,
        url: &str,
        _body: &Value,
        _bearer: Option<&str>,
    ) -> Result<Value, ServiceError> {
        *self.hits.lock().entry(url.to_string()).or_insert(0) += 1;
        match self.responses.lock().get(url) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(detail)) => {
                Err(ServiceError::Unreachable { service: "mock", detail: detail.clone() })
            }
            None => Err(ServiceError::Http { service: "mock", status: 404, detail: "no stub".into() }),
        }
    }

    async fn is_host_available(&self, _host: &str, _port: u16) -> bool {
        *self.available.lock()
    }
}
