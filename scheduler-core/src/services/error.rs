//! Errors raised by external-service adapters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} unreachable: {detail}")]
    Unreachable { service: &'static str, detail: String },

    #[error("http error calling {service}: {status} {detail}")]
    Http { service: &'static str, status: u16, detail: String },

    #[error("auth error calling {service}: {detail}")]
    Auth { service: &'static str, detail: String },
}

/// Replaces the source's `ExpiredError`-as-control-flow pattern (§9): a
/// cache read either hits or reports staleness explicitly, the caller
/// decides whether to retry after a refresh.
#[derive(Clone, Debug)]
pub enum CacheLookup<T> {
    Hit(T),
    Expired,
}

impl<T> CacheLookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            CacheLookup::Hit(v) => Some(v),
            CacheLookup::Expired => None,
        }
    }
}
