use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::shared::AppError;

/// Default upper bound on cached projections
const DEFAULT_CAPACITY: u64 = 10_000;

/// Default expiry for cached values (10 minutes)
const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Trait for key-value caches whose entries expire after the store's TTL
#[async_trait]
pub trait CacheStore {
    /// Returns the value for `key` unless it is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError>;
    /// Stores `value` under `key`, replacing any previous value and
    /// restarting its expiry.
    async fn set(&self, key: &str, value: Value) -> Result<(), AppError>;
    /// Removes `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// In-memory implementation of CacheStore backed by moka.
///
/// Expired entries are reclaimed by moka's housekeeping whether or not they
/// are read again. Data is lost when the process restarts and is not shared
/// between instances.
pub struct InMemoryCacheStore {
    entries: Cache<String, Value>,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl InMemoryCacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, ttl)
    }

    pub fn with_capacity(capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Number of live entries after pending evictions have been applied
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Checks for a live (unexpired) entry
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let value = self.entries.get(key).await;
        debug!(key = %key, hit = value.is_some(), "Cache lookup");
        Ok(value)
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: Value) -> Result<(), AppError> {
        debug!(key = %key, "Caching value");
        self.entries.insert(key.to_string(), value).await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.entries.invalidate(key).await;
        debug!(key = %key, "Cache key invalidated");
        Ok(())
    }
}
