use async_trait::async_trait;
use std::{collections::HashMap, time::Instant};
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

/// Process-local cache. Entries carry their own expiry and read as absent once it passes.
pub struct InMemoryCacheStore {
    pub(super) entry: Mutex<HashMap<String, (CacheData, Instant)>>,
}

/// Redis-backed cache. Expiry is delegated to Redis.
pub struct RedisCacheStore {
    pub(super) client: redis::Client,
}

/// Short-lived keyed storage with TTL.
///
/// Implementations must make `remove` and `remove_if_equal` atomic: when several callers
/// remove the same entry concurrently, exactly one of them observes `true`.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StorageError>;

    /// Put a value into the store, replacing any existing one, expiring after `ttl` seconds.
    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: u64,
    ) -> Result<(), StorageError>;

    /// Get a value from the store.
    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError>;

    /// Remove a value. Returns whether a live entry was deleted.
    async fn remove(&self, prefix: &str, key: &str) -> Result<bool, StorageError>;

    /// Remove the value only if it is still exactly `expected`. Returns whether it was deleted.
    async fn remove_if_equal(
        &self,
        prefix: &str,
        key: &str,
        expected: &CacheData,
    ) -> Result<bool, StorageError>;
}
