//! Race fill: probe the cache and fetch from the backend at the same time.

use std::fmt;
use std::future::Future;

use dashcache_core::{Codec, KeyStrategy};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::aside::{CacheAside, CacheAsideError};
use crate::metrics::RaceWinner;

impl<A, K, C> CacheAside<A, K, C>
where
    K: KeyStrategy<A>,
    C: Codec + 'static,
    C::Value: Send + 'static,
{
    /// Answers with whichever of the cache probe or the backend fetch
    /// publishes first.
    ///
    /// Both run as separate tasks and publish into a one-slot channel; the
    /// first publication wins. The backend task always writes its result
    /// back, even after losing, so the entry is refreshed on every call.
    /// When the probe misses and the fetch fails, the fetch error is
    /// returned.
    pub async fn race_fill<F, Fut, E>(&self, args: A, fetch: F) -> Result<C::Value, CacheAsideError<E>>
    where
        A: Send + 'static,
        F: FnOnce(A) -> Fut + Send + 'static,
        Fut: Future<Output = Result<C::Value, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let key = self.keys.derive(&args)?;
        let ttl = self.ttl.resolve(&args);
        let (tx, mut rx) = mpsc::channel::<(RaceWinner, C::Value)>(1);

        let probe_tx = tx.clone();
        let entries = self.entries.clone();
        let probe_key = key.clone();
        tokio::spawn(async move {
            if let Some(value) = entries.probe(&probe_key).await {
                let _ = probe_tx.try_send((RaceWinner::Cache, value));
            }
        });

        let entries = self.entries.clone();
        let backend = tokio::spawn(async move {
            let value = match fetch(args).await {
                Ok(value) => value,
                Err(error) => {
                    warn!(key = %key, error = %error, "Backend fetch failed during race fill");
                    return Err(error);
                },
            };

            let payload = entries.encode(&key, &value);
            // Publish first; the write-back finishes after the caller has its answer.
            let _ = tx.try_send((RaceWinner::Backend, value));
            if let Some(payload) = payload {
                entries.store(&key, &payload, ttl).await;
            }
            Ok(())
        });

        if let Some((winner, value)) = rx.recv().await {
            self.metrics().record_race_winner(winner);
            debug!(
                namespace = %self.namespace(),
                winner = winner.as_str(),
                "Race fill answered"
            );
            return Ok(value);
        }

        // Neither side published: the probe missed and the fetch did not
        // produce a value.
        match backend.await {
            Ok(Err(error)) => Err(CacheAsideError::Fetch(error)),
            Ok(Ok(())) => Err(CacheAsideError::NoResult),
            Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
            Err(_) => Err(CacheAsideError::NoResult),
        }
    }
}
