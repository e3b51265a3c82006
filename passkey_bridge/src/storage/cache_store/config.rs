//! Cache store selection from the environment

use std::{fmt, str::FromStr, sync::Arc};

use crate::config::{env_or, env_parse};
use crate::storage::errors::StorageError;

use super::types::{CacheStore, InMemoryCacheStore, RedisCacheStore};

const DEFAULT_CACHE_STORE_URL: &str = "redis://localhost:6379";

/// Which cache backend holds the challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStoreKind {
    Memory,
    Redis,
}

impl FromStr for CacheStoreKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(StorageError::Storage(format!(
                "Unsupported cache store type: {other}. Supported types are 'memory' and 'redis'"
            ))),
        }
    }
}

impl fmt::Display for CacheStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

/// Builds and initializes the cache store named by `GENERIC_CACHE_STORE_TYPE`
/// (`memory` by default), connecting to `GENERIC_CACHE_STORE_URL` or `REDIS_URL`.
pub async fn cache_store_from_env() -> Result<Arc<dyn CacheStore>, StorageError> {
    let kind = env_parse(&["GENERIC_CACHE_STORE_TYPE"], CacheStoreKind::Memory);

    let store: Arc<dyn CacheStore> = match kind {
        CacheStoreKind::Memory => Arc::new(InMemoryCacheStore::new()),
        CacheStoreKind::Redis => {
            let url = env_or(
                &["GENERIC_CACHE_STORE_URL", "REDIS_URL"],
                DEFAULT_CACHE_STORE_URL,
            );
            tracing::info!("Initializing cache store with type: {}, url: {}", kind, url);
            Arc::new(RedisCacheStore::new(&url)?)
        }
    };

    store.init().await?;
    tracing::info!("Cache store ready: {}", kind);
    Ok(store)
}
