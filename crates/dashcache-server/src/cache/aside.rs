//! Cache-aside orchestration over a [`StoreClient`].

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use dashcache_core::{CacheKey, Codec, KeyError, KeyStrategy};
use dashcache_store::{StoreClient, StoreResult};
use thiserror::Error;
use tracing::{debug, warn};

use super::policy::{Layout, Ttl};
use crate::metrics::CacheMetrics;

/// Error del orquestador.
///
/// Store failures never show up here: they degrade to a backend fetch or a
/// skipped write-back. Only key derivation and the backend itself can fail
/// a call.
#[derive(Debug, Error)]
pub enum CacheAsideError<E> {
    /// Los argumentos no producen una key valida; no se hizo ninguna I/O.
    #[error("cache key derivation failed: {0}")]
    Key(#[from] KeyError),

    /// El backend fallo; el error se propaga tal cual.
    #[error("{0}")]
    Fetch(E),

    /// A race fill ended with neither side publishing.
    #[error("race fill finished without a result")]
    NoResult,
}

impl<E> CacheAsideError<E> {
    /// Returns the backend error, if this is one.
    pub fn into_fetch(self) -> Option<E> {
        match self {
            CacheAsideError::Fetch(e) => Some(e),
            _ => None,
        }
    }
}

/// Reads and writes encoded entries, absorbing store and codec failures.
pub(crate) struct Entries<C> {
    store: Arc<dyn StoreClient>,
    codec: Arc<C>,
    layout: Layout,
    metrics: CacheMetrics,
    namespace: Arc<str>,
}

impl<C> Clone for Entries<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codec: Arc::clone(&self.codec),
            layout: self.layout.clone(),
            metrics: self.metrics.clone(),
            namespace: Arc::clone(&self.namespace),
        }
    }
}

impl<C: Codec> Entries<C> {
    async fn read_raw(&self, key: &CacheKey) -> StoreResult<Option<Vec<u8>>> {
        match &self.layout {
            Layout::Keys => self.store.get(key.as_str()).await,
            Layout::Hash { hash_key } => self.store.hget(hash_key, key.as_str()).await,
        }
    }

    async fn write_raw(&self, key: &CacheKey, payload: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        match &self.layout {
            Layout::Keys => self.store.set(key.as_str(), payload, ttl).await,
            Layout::Hash { hash_key } => self.store.hset(hash_key, key.as_str(), payload).await,
        }
    }

    /// Decodes a stored payload. Undecodable payloads count as a miss.
    pub(crate) fn decode(&self, key: &CacheKey, payload: Option<Vec<u8>>) -> Option<C::Value> {
        let payload = payload?;
        match self.codec.decode(&payload) {
            Ok(value) => Some(value),
            Err(error) => {
                self.metrics.record_decode_error();
                warn!(
                    namespace = %self.namespace,
                    key = %key,
                    codec = self.codec.kind().as_str(),
                    error = %error,
                    "Cached payload could not be decoded, refetching"
                );
                None
            },
        }
    }

    /// Looks the key up. A failed probe is reported and treated as a miss.
    pub(crate) async fn probe(&self, key: &CacheKey) -> Option<C::Value> {
        let payload = match self.read_raw(key).await {
            Ok(payload) => payload,
            Err(error) => {
                self.metrics.record_probe_error();
                warn!(
                    namespace = %self.namespace,
                    key = %key,
                    error = %error,
                    "Cache probe failed, falling back to backend"
                );
                return None;
            },
        };

        let value = self.decode(key, payload);
        if value.is_some() {
            self.metrics.record_hits(1);
            debug!(namespace = %self.namespace, key = %key, "Cache hit");
        } else {
            self.metrics.record_misses(1);
            debug!(namespace = %self.namespace, key = %key, "Cache miss");
        }
        value
    }

    /// Looks up every key, preserving positions.
    pub(crate) async fn probe_many(&self, keys: &[CacheKey]) -> Vec<Option<C::Value>> {
        let payloads = match &self.layout {
            Layout::Keys => {
                let names: Vec<String> = keys.iter().map(|k| k.as_str().to_string()).collect();
                self.store.mget(&names).await
            },
            Layout::Hash { hash_key } => {
                futures::future::try_join_all(
                    keys.iter()
                        .map(|key| self.store.hget(hash_key, key.as_str())),
                )
                .await
            },
        };

        let payloads = match payloads {
            Ok(payloads) => payloads,
            Err(error) => {
                self.metrics.record_probe_error();
                warn!(
                    namespace = %self.namespace,
                    keys = keys.len(),
                    error = %error,
                    "Cache probe failed, fetching every element"
                );
                return keys.iter().map(|_| None).collect();
            },
        };

        let values: Vec<Option<C::Value>> = keys
            .iter()
            .zip(payloads)
            .map(|(key, payload)| self.decode(key, payload))
            .collect();

        let hits = values.iter().filter(|v| v.is_some()).count() as u64;
        self.metrics.record_hits(hits);
        self.metrics.record_misses(values.len() as u64 - hits);
        debug!(
            namespace = %self.namespace,
            hits,
            total = values.len(),
            "Cache fan-out probe"
        );
        values
    }

    /// Encodes a fetched value. Encoding failures skip the write-back.
    pub(crate) fn encode(&self, key: &CacheKey, value: &C::Value) -> Option<Vec<u8>> {
        match self.codec.encode(value) {
            Ok(payload) => Some(payload),
            Err(error) => {
                self.metrics.record_writeback_error();
                warn!(
                    namespace = %self.namespace,
                    key = %key,
                    error = %error,
                    "Fetched value could not be encoded, not caching it"
                );
                None
            },
        }
    }

    /// Writes an encoded payload back. Failures are logged, never returned.
    pub(crate) async fn store(&self, key: &CacheKey, payload: &[u8], ttl: Option<Duration>) {
        let ttl = match self.layout {
            Layout::Keys => ttl,
            Layout::Hash { .. } => None,
        };

        match self.write_raw(key, payload, ttl).await {
            Ok(()) => debug!(
                namespace = %self.namespace,
                key = %key,
                ttl_secs = ttl.map(|t| t.as_secs()),
                "Cache entry written"
            ),
            Err(error) => {
                self.metrics.record_writeback_error();
                warn!(
                    namespace = %self.namespace,
                    key = %key,
                    error = %error,
                    "Cache write-back failed, value returned uncached"
                );
            },
        }
    }

    pub(crate) async fn write_back(&self, key: &CacheKey, value: &C::Value, ttl: Option<Duration>) {
        if let Some(payload) = self.encode(key, value) {
            self.store(key, &payload, ttl).await;
        }
    }
}

/// Cache-aside combinator: one key strategy, one codec, one namespace.
///
/// Calls derive their key before any I/O, probe the store, and fall back to
/// the caller's backend fetch on a miss. The fetched value is written back
/// with the configured expiry before being returned.
///
/// # Example
///
/// ```ignore
/// let area = CacheAside::new(store, "AREA", AreaKey::new("AREA::"), TabularCodec::default())
///     .with_ttl(Ttl::fixed_secs(180 * 86_400));
///
/// let rows = area
///     .get_or_fetch(AreaQuery::overview("2021-01-04"), |query| db.area_rows(query))
///     .await?;
/// ```
pub struct CacheAside<A, K, C> {
    pub(crate) entries: Entries<C>,
    pub(crate) keys: K,
    pub(crate) ttl: Ttl<A>,
    _args: PhantomData<fn(&A)>,
}

impl<A, K, C> CacheAside<A, K, C>
where
    K: KeyStrategy<A>,
    C: Codec,
{
    /// Creates an orchestrator writing persistent top-level keys.
    pub fn new(store: Arc<dyn StoreClient>, namespace: &str, keys: K, codec: C) -> Self {
        Self {
            entries: Entries {
                store,
                codec: Arc::new(codec),
                layout: Layout::Keys,
                metrics: CacheMetrics::new(namespace),
                namespace: Arc::from(namespace),
            },
            keys,
            ttl: Ttl::Persistent,
            _args: PhantomData,
        }
    }

    pub fn with_ttl(mut self, ttl: Ttl<A>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.entries.layout = layout;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.entries.namespace
    }

    pub fn layout(&self) -> &Layout {
        &self.entries.layout
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.entries.metrics
    }

    /// Returns the cached value for `args`, fetching and caching it on a miss.
    ///
    /// `fetch` runs at most once. Its error is returned as
    /// [`CacheAsideError::Fetch`]; store and decode failures only cost a
    /// warning.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        args: A,
        fetch: F,
    ) -> Result<C::Value, CacheAsideError<E>>
    where
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<C::Value, E>>,
    {
        let key = self.keys.derive(&args)?;

        if let Some(value) = self.entries.probe(&key).await {
            return Ok(value);
        }

        let ttl = self.ttl.resolve(&args);
        let value = fetch(args).await.map_err(CacheAsideError::Fetch)?;
        self.entries.write_back(&key, &value, ttl).await;

        Ok(value)
    }
}

impl<A, K, C> std::fmt::Debug for CacheAside<A, K, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("namespace", &self.entries.namespace)
            .field("layout", &self.entries.layout)
            .field("ttl", &self.ttl)
            .finish()
    }
}
