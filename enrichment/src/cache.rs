//! Key/value store used as the fallback source of courier profiles.

use async_trait::async_trait;
use bytes::Bytes;
use moka::Expiry;
use moka::sync::Cache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Multi-key reads may return a partial result. A missing entry is `None`
/// at the position of its key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Bytes>>, CacheError>;

    async fn set_with_expiry(
        &self,
        key: &str,
        ttl: Duration,
        value: Bytes,
    ) -> Result<(), CacheError>;
}

fn default_max_capacity() -> u64 {
    10_000
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum CacheConfig {
    Memory {
        #[serde(default = "default_max_capacity")]
        max_capacity: u64,
    },
    Noop,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Memory {
            max_capacity: default_max_capacity(),
        }
    }
}

pub fn from_config(config: &CacheConfig) -> Arc<dyn CacheStore> {
    match config {
        CacheConfig::Memory { max_capacity } => Arc::new(MemoryCacheStore::new(*max_capacity)),
        CacheConfig::Noop => {
            tracing::warn!("cache disabled, enrichment fails whenever the users service does");
            Arc::new(NoopCacheStore {})
        }
    }
}

#[derive(Clone)]
struct Entry {
    value: Bytes,
    ttl: Duration,
}

// Each entry expires after the ttl it was written with.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Bounded in-process store.
pub struct MemoryCacheStore {
    cache: Cache<String, Entry>,
}

impl MemoryCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();

        MemoryCacheStore { cache }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self.cache.get(key).map(|entry| entry.value))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Bytes>>, CacheError> {
        Ok(keys
            .iter()
            .map(|key| self.cache.get(key).map(|entry| entry.value))
            .collect())
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        ttl: Duration,
        value: Bytes,
    ) -> Result<(), CacheError> {
        self.cache.insert(key.to_string(), Entry { value, ttl });
        Ok(())
    }
}

/// Stores nothing and misses every read.
pub struct NoopCacheStore {}

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(None)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Bytes>>, CacheError> {
        Ok(vec![None; keys.len()])
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _ttl: Duration,
        _value: Bytes,
    ) -> Result<(), CacheError> {
        Ok(())
    }
}
