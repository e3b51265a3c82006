mod cache_store;
mod errors;
mod types;

pub use cache_store::{
    CacheStore, CacheStoreKind, InMemoryCacheStore, RedisCacheStore, cache_store_from_env,
};
pub use errors::StorageError;
pub use types::CacheData;
