//! A generic TTL-expiring cache, the building block for the catalogue
//! client's three independent caches (plugins-by-org, boefjes-by-ooi_type,
//! normalizers-by-mime_type).
//!
//! Backed by `moka::future::Cache`, which evicts expired entries via a
//! lock-free internal structure rather than a `Mutex`/`RwLock`-guarded map —
//! readers are never blocked behind a writer refreshing another key.

use std::hash::Hash;
use std::time::Duration;

use moka::future::Cache;

use super::error::CacheLookup;

/// Readers see either the pre- or post-refresh snapshot atomically: moka's
/// own concurrency control handles this without an explicit lock here.
pub struct TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<K, V>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self { cache: Cache::builder().time_to_live(ttl).build() }
    }

    /// A key past its TTL has already been evicted by moka, so "expired"
    /// and "never cached" are indistinguishable here — both report
    /// `Expired` (§9: explicit two-valued return, caller retries once
    /// after a refresh).
    pub async fn get(&self, key: &K) -> CacheLookup<V> {
        match self.cache.get(key).await {
            Some(value) => CacheLookup::Hit(value),
            None => CacheLookup::Expired,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        self.cache.insert(key, value).await;
    }

    pub fn invalidate(&self, key: &K) {
        self.cache.invalidate(key);
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
