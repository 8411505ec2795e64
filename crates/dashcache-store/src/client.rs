//! The store client contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::telemetry::Dependency;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Asynchronous key-value store used by the cache-aside orchestrator.
///
/// Values are opaque bytes. A read that fails returns an error, never
/// `None`: `None` always means the key is absent.
#[async_trait]
pub trait StoreClient: Dependency {
    /// Reads a single key.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes a key, with an expiry when `ttl` is set.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()>;

    /// Reads many keys in one round trip. The result is positional.
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>>;

    /// Reads one field of a hash.
    async fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes one field of a hash. Hash fields never expire.
    async fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()>;

    /// Checks connectivity.
    async fn ping(&self) -> StoreResult<String>;
}

impl<S: Dependency + ?Sized> Dependency for Arc<S> {
    fn dependency_type(&self) -> &str {
        (**self).dependency_type()
    }

    fn target(&self) -> &str {
        (**self).target()
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        (**self).attributes()
    }
}

#[async_trait]
impl<S: StoreClient + ?Sized> StoreClient for Arc<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        (**self).set(key, value, ttl).await
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        (**self).mget(keys).await
    }

    async fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).hget(hash, field).await
    }

    async fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        (**self).hset(hash, field, value).await
    }

    async fn ping(&self) -> StoreResult<String> {
        (**self).ping().await
    }
}
