//! Pluggable persistent cache tier (§4.5): an optional second tier behind
//! the in-memory one, implemented by the host application (a Redis client,
//! a disk-backed store, etc). Grounded on the `CacheStore` trait in
//! `dashflow-registry::cache`, narrowed to the byte-oriented operations the
//! Discovery Cache needs.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// A byte-oriented persistent cache backend. Implementations should be
/// cheap to clone (e.g. wrap a connection pool) and `Send + Sync`.
#[async_trait]
pub trait PersistentCacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;
}

/// A persistent store that never has anything cached. Default when no
/// second tier is configured; also useful in tests.
pub struct NoPersistentStore;

#[async_trait]
impl PersistentCacheStore for NoPersistentStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}
