use async_trait::async_trait;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

use super::types::{CacheStore, InMemoryCacheStore};

const CACHE_PREFIX: &str = "cache";

impl InMemoryCacheStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory cache store");
        Self {
            entry: Mutex::new(HashMap::new()),
        }
    }

    fn make_key(prefix: &str, key: &str) -> String {
        format!("{CACHE_PREFIX}:{prefix}:{key}")
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: u64,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl))
            .ok_or_else(|| StorageError::Storage(format!("TTL of {ttl}s is out of range")))?;
        let mut entries = self.entry.lock().await;
        // Drop expired entries
        let now = Instant::now();
        entries.retain(|_, (_, exp)| *exp > now);
        entries.insert(key, (value, expires_at));
        Ok(())
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let key = Self::make_key(prefix, key);
        let mut entries = self.entry.lock().await;
        match entries.get(&key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(&key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn remove(&self, prefix: &str, key: &str) -> Result<bool, StorageError> {
        let key = Self::make_key(prefix, key);
        let mut entries = self.entry.lock().await;
        Ok(matches!(
            entries.remove(&key),
            Some((_, expires_at)) if expires_at > Instant::now()
        ))
    }

    async fn remove_if_equal(
        &self,
        prefix: &str,
        key: &str,
        expected: &CacheData,
    ) -> Result<bool, StorageError> {
        let key = Self::make_key(prefix, key);
        let mut entries = self.entry.lock().await;
        let live_match = match entries.get(&key) {
            Some((value, expires_at)) => *expires_at > Instant::now() && value == expected,
            None => false,
        };
        if live_match {
            entries.remove(&key);
        }
        Ok(live_match)
    }
}
