//! In-process store used for local runs and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use parking_lot::RwLock;

use crate::client::{StoreClient, StoreResult};
use crate::error::StoreError;
use crate::telemetry::Dependency;

#[derive(Debug, Clone)]
struct Entry {
    value: Arc<Vec<u8>>,
    ttl: Option<Duration>,
}

/// Per-entry expiry: each entry lives for the TTL it was written with.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Store client backed by a Moka cache.
///
/// Behaves like the remote store for the operations the orchestrator uses,
/// and can be switched off or slowed down to exercise degraded paths.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, Entry>,
    hashes: Arc<RwLock<HashMap<String, HashMap<String, Arc<Vec<u8>>>>>>,
    available: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
    writes: Arc<AtomicU64>,
    name: String,
}

impl MemoryStore {
    /// Creates an empty store holding at most `max_capacity` keys.
    pub fn new(max_capacity: u64) -> Self {
        Self::named("memory", max_capacity)
    }

    /// Creates an empty store reported under `name`.
    pub fn named(name: impl Into<String>, max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self {
            entries,
            hashes: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            latency_ms: Arc::new(AtomicU64::new(0)),
            writes: Arc::new(AtomicU64::new(0)),
            name: name.into(),
        }
    }

    /// Marks the store reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Adds a fixed delay to every operation.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful writes (`set` and `hset`).
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// TTL the key was last written with. `None` if the key is absent.
    pub async fn ttl_of(&self, key: &str) -> Option<Option<Duration>> {
        self.entries.get(key).await.map(|entry| entry.ttl)
    }

    /// Returns true if the hash has the field, without the availability check.
    pub fn has_field(&self, hash: &str, field: &str) -> bool {
        self.hashes
            .read()
            .get(hash)
            .is_some_and(|fields| fields.contains_key(field))
    }

    async fn enter(&self) -> StoreResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(format!("{} is offline", self.name)));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("name", &self.name)
            .field("entries", &self.entries.entry_count())
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Dependency for MemoryStore {
    fn dependency_type(&self) -> &str {
        "Memory"
    }

    fn target(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.enter().await?;
        Ok(self
            .entries
            .get(key)
            .await
            .map(|entry| entry.value.as_ref().clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.enter().await?;
        let entry = Entry {
            value: Arc::new(value.to_vec()),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        self.enter().await?;
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(
                self.entries
                    .get(key)
                    .await
                    .map(|entry| entry.value.as_ref().clone()),
            );
        }
        Ok(values)
    }

    async fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        self.enter().await?;
        Ok(self
            .hashes
            .read()
            .get(hash)
            .and_then(|fields| fields.get(field))
            .map(|value| value.as_ref().clone()))
    }

    async fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        self.enter().await?;
        self.hashes
            .write()
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), Arc::new(value.to_vec()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<String> {
        self.enter().await?;
        Ok("PONG".to_string())
    }
}
