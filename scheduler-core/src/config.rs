//! Environment-driven configuration (§6.4), loaded into a typed struct at
//! startup. Mirrors the teacher's `AppConfig` builder-style shape: a
//! `Config::from_env()` constructor with `with_*` overrides layered on top,
//! so `kat-scheduler-cli` can merge CLI flags over the environment without
//! the core crate knowing anything about `clap`.

use std::env;
use std::time::Duration;

const DEFAULT_API_HOST: &str = "0.0.0.0";
const DEFAULT_API_PORT: u16 = 8000;
const DEFAULT_PQ_MAXSIZE: usize = 1000;
const DEFAULT_PQ_POPULATE_INTERVAL_SECS: u64 = 60;
const DEFAULT_PQ_POPULATE_GRACE_PERIOD_SECS: u64 = 86_400;
const DEFAULT_RANDOM_FILL_N: u32 = 50;
const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 3600;
const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 5;

/// Host/port/credentials for one of the three external services consumed
/// over HTTP (§6.3), plus the per-service request timeout (§6.4 `{svc}_*`).
#[derive(Clone, Debug)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub user: String,
    pub pass: String,
    pub timeout: Duration,
}

impl ServiceEndpoint {
    fn from_env(service: &str, default_port: u16) -> Self {
        let host = env_or(&format!("{service}_host"), "localhost");
        let port = env_parsed(&format!("{service}_port"), default_port);
        let base_url = env::var(format!("{}_url", service.to_uppercase()))
            .unwrap_or_else(|_| format!("http://{host}:{port}"));
        Self {
            user: env_or(&format!("{service}_user"), ""),
            pass: env_or(&format!("{service}_pass"), ""),
            timeout: Duration::from_secs(env_parsed(&format!("{service}_timeout"), DEFAULT_SERVICE_TIMEOUT_SECS)),
            host,
            port,
            base_url,
        }
    }
}

/// Top-level scheduler configuration (§6.4). Defaults match §5's timeout
/// table; every field can be overridden with a `with_*` builder method or
/// picked up from the environment via [`Config::from_env`].
#[derive(Clone, Debug)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub pq_maxsize: usize,
    pub pq_populate_interval: Duration,
    pub pq_populate_grace_period: Duration,
    pub random_fill_n: u32,
    pub dsp_broker_url: String,
    pub lst_octopoes: String,
    pub monitor_interval: Duration,
    pub health_check_interval: Duration,
    pub katalogus: ServiceEndpoint,
    pub octopoes: ServiceEndpoint,
    pub bytes: ServiceEndpoint,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            pq_maxsize: DEFAULT_PQ_MAXSIZE,
            pq_populate_interval: Duration::from_secs(DEFAULT_PQ_POPULATE_INTERVAL_SECS),
            pq_populate_grace_period: Duration::from_secs(DEFAULT_PQ_POPULATE_GRACE_PERIOD_SECS),
            random_fill_n: DEFAULT_RANDOM_FILL_N,
            dsp_broker_url: "http://localhost:5672".to_string(),
            lst_octopoes: "http://localhost:8002".to_string(),
            monitor_interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
            health_check_interval: Duration::from_secs(DEFAULT_HEALTH_CHECK_INTERVAL_SECS),
            katalogus: ServiceEndpoint::from_env("katalogus", 8003),
            octopoes: ServiceEndpoint::from_env("octopoes", 8002),
            bytes: ServiceEndpoint::from_env("bytes", 8004),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, falling back to
    /// §5/§6.4 defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_host: env_or("api_host", &defaults.api_host),
            api_port: env_parsed("api_port", defaults.api_port),
            pq_maxsize: env_parsed("pq_maxsize", defaults.pq_maxsize),
            pq_populate_interval: Duration::from_secs(env_parsed(
                "pq_populate_interval",
                defaults.pq_populate_interval.as_secs(),
            )),
            pq_populate_grace_period: Duration::from_secs(env_parsed(
                "pq_populate_grace_period",
                defaults.pq_populate_grace_period.as_secs(),
            )),
            random_fill_n: env_parsed("random_fill_n", defaults.random_fill_n),
            dsp_broker_url: env_or("dsp_broker_url", &defaults.dsp_broker_url),
            lst_octopoes: env_or("lst_octopoes", &defaults.lst_octopoes),
            ..defaults
        }
    }

    pub fn with_api_bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.api_host = host.into();
        self.api_port = port;
        self
    }

    pub fn with_pq_maxsize(mut self, maxsize: usize) -> Self {
        self.pq_maxsize = maxsize;
        self
    }

    pub fn with_pq_populate_interval(mut self, interval: Duration) -> Self {
        self.pq_populate_interval = interval;
        self
    }

    pub fn with_pq_populate_grace_period(mut self, grace_period: Duration) -> Self {
        self.pq_populate_grace_period = grace_period;
        self
    }

    pub fn with_random_fill_n(mut self, n: u32) -> Self {
        self.random_fill_n = n;
        self
    }

    pub fn with_broker_url(mut self, url: impl Into<String>) -> Self {
        self.dsp_broker_url = url.into();
        self
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
