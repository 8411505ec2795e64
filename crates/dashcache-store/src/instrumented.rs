//! Telemetry decorator for store clients.

use std::time::Duration;

use async_trait::async_trait;

use crate::client::{StoreClient, StoreResult};
use crate::telemetry::{CallContext, Dependency, presence, presence_all, traced, traced_with};

/// Wraps a [`StoreClient`] so every operation emits one dependency span.
///
/// Reads record `HIT`/`MISS` (and `PARTIAL` for `mget`); writes record the
/// expiry. Errors pass through unchanged.
#[derive(Debug, Clone)]
pub struct Instrumented<S> {
    inner: S,
}

impl<S> Instrumented<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Dependency> Dependency for Instrumented<S> {
    fn dependency_type(&self) -> &str {
        self.inner.dependency_type()
    }

    fn target(&self) -> &str {
        self.inner.target()
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        self.inner.attributes()
    }
}

#[async_trait]
impl<S: StoreClient> StoreClient for Instrumented<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        traced_with(
            &self.inner,
            CallContext::new("get", "GET").key(key),
            self.inner.get(key),
            presence,
        )
        .await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        traced(
            &self.inner,
            CallContext::new("set", "SET").key(key).expire(ttl),
            self.inner.set(key, value, ttl),
        )
        .await
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        traced_with(
            &self.inner,
            CallContext::new("mget", "MGET").key(keys.join(" ")),
            self.inner.mget(keys),
            presence_all,
        )
        .await
    }

    async fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        traced_with(
            &self.inner,
            CallContext::new("hget", "HGET").key(format!("{} {}", hash, field)),
            self.inner.hget(hash, field),
            presence,
        )
        .await
    }

    async fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        traced(
            &self.inner,
            CallContext::new("hset", "HSET").key(format!("{} {}", hash, field)),
            self.inner.hset(hash, field, value),
        )
        .await
    }

    async fn ping(&self) -> StoreResult<String> {
        traced(
            &self.inner,
            CallContext::new("ping", "PING"),
            self.inner.ping(),
        )
        .await
    }
}
