//! Vector fan-out: one cache entry per element of a request.

use std::future::Future;

use dashcache_core::{Codec, KeySet, KeyStrategy};
use futures::future::try_join_all;
use tracing::debug;

use super::aside::{CacheAside, CacheAsideError};

impl<A, K, C> CacheAside<A, K, C>
where
    K: KeyStrategy<A>,
    C: Codec,
{
    /// Resolves every element of `items` through the cache.
    ///
    /// All keys are probed in one round trip (`MGET`, or one `HGET` per
    /// element for the hash layout). Only the missing elements are fetched,
    /// concurrently, and each is written back on its own. Results come back
    /// in the order of `items`; an empty request returns an empty result
    /// without touching the store.
    pub async fn get_or_fetch_many<F, Fut, E>(
        &self,
        items: Vec<A>,
        fetch: F,
    ) -> Result<Vec<C::Value>, CacheAsideError<E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<C::Value, E>>,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let keys = match self.keys.derive_many(&items)? {
            KeySet::Many(keys) => keys,
            KeySet::Single(key) => vec![key],
        };

        let mut results = self.entries.probe_many(&keys).await;
        let missing = results.iter().filter(|v| v.is_none()).count();
        if missing == 0 {
            return Ok(results.into_iter().flatten().collect());
        }

        debug!(
            namespace = %self.namespace(),
            missing,
            total = items.len(),
            "Fetching missing fan-out elements"
        );

        let pending = items
            .into_iter()
            .zip(keys)
            .enumerate()
            .filter(|(index, _)| results[*index].is_none())
            .map(|(index, (item, key))| {
                let ttl = self.ttl.resolve(&item);
                let fetched = fetch(item);
                async move {
                    let value = fetched.await?;
                    self.entries.write_back(&key, &value, ttl).await;
                    Ok::<_, E>((index, value))
                }
            });

        let fetched = try_join_all(pending)
            .await
            .map_err(CacheAsideError::Fetch)?;

        for (index, value) in fetched {
            results[index] = Some(value);
        }

        Ok(results.into_iter().flatten().collect())
    }
}
