//! Cache-aside storage shared by every platform integration.
//!
//! Values are JSON encoded before they reach a [`CacheStore`], so a backend only
//! ever deals with opaque bytes and a TTL. Two backends exist:
//!
//! - [`MemoryCacheStore`]: process local, bounded, per-entry expiry.
//! - [`RedisCacheStore`]: shared between processes, expiry handled by redis.
//!
//! The backend is picked once from [`CacheBackendConfig`]; callers only see [`Cache`].
//!
//! There is no lock across the "read / compute / write" sequence. Two callers that
//! miss the same key at the same time both compute, and the last write wins.

mod memory;
mod remote;

pub use memory::MemoryCacheStore;
pub use remote::RedisCacheStore;

use crate::counter;
use crate::metrics_defs::{CACHE_DECODE_ERROR, CACHE_HIT, CACHE_MISS};
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;
const DEFAULT_REDIS_PREFIX: &str = "contributions";

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T, E = CacheError> = std::result::Result<T, E>;

/// A key/value byte store with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

/// Outcome of a get-or-compute call.
///
/// `is_hit` is the only way to tell a freshly computed value from a cached one.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheResult<T> {
    pub value: Option<T>,
    pub is_hit: bool,
}

impl<T> CacheResult<T> {
    pub fn hit(value: T) -> Self {
        CacheResult {
            value: Some(value),
            is_hit: true,
        }
    }

    pub fn miss(value: Option<T>) -> Self {
        CacheResult {
            value,
            is_hit: false,
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum CacheBackendConfig {
    Memory {
        #[serde(default = "default_max_capacity")]
        max_capacity: u64,
    },
    Redis {
        url: String,
        #[serde(default = "default_redis_prefix")]
        prefix: String,
    },
}

fn default_max_capacity() -> u64 {
    DEFAULT_MAX_CAPACITY
}

fn default_redis_prefix() -> String {
    DEFAULT_REDIS_PREFIX.into()
}

impl Default for CacheBackendConfig {
    fn default() -> Self {
        CacheBackendConfig::Memory {
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

/// Handle to the configured cache backend. Cheap to clone.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Cache { store }
    }

    pub fn in_memory(max_capacity: u64) -> Self {
        Cache::new(Arc::new(MemoryCacheStore::new(max_capacity)))
    }

    pub fn from_config(config: &CacheBackendConfig) -> Result<Self> {
        match config {
            CacheBackendConfig::Memory { max_capacity } => Ok(Cache::in_memory(*max_capacity)),
            CacheBackendConfig::Redis { url, prefix } => {
                Ok(Cache::new(Arc::new(RedisCacheStore::new(url, prefix)?)))
            }
        }
    }

    /// Reads and decodes a value. Entries that no longer decode are treated as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.store.get(key).await? else {
            counter!(CACHE_MISS).increment(1);
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                counter!(CACHE_HIT).increment(1);
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding cache entry that could not be decoded");
                counter!(CACHE_DECODE_ERROR).increment(1);
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(key, bytes, ttl).await
    }

    /// Returns the cached value for `key`, or runs `factory` and stores what it produced.
    ///
    /// A factory result of `None` is handed back to the caller but never written.
    pub async fn get_or_set_with_status<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        factory: F,
    ) -> std::result::Result<CacheResult<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await? {
            return Ok(CacheResult::hit(cached));
        }

        let value = factory().await?;
        if let Some(value) = &value {
            self.set(key, value, ttl).await?;
        }

        Ok(CacheResult::miss(value))
    }

    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        factory: F,
    ) -> std::result::Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
    {
        Ok(self.get_or_set_with_status(key, ttl, factory).await?.value)
    }

    /// Like [`Cache::get_or_set`] for lists. An empty list is a valid value and is cached.
    pub async fn get_or_set_collection<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        factory: F,
    ) -> std::result::Result<Vec<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Vec<T>, E>>,
    {
        if let Some(cached) = self.get::<Vec<T>>(key).await? {
            return Ok(cached);
        }

        let values = factory().await?;
        self.set(key, &values, ttl).await?;
        Ok(values)
    }
}
