//! Expiry and storage layout policies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Expiry applied to entries written back by the orchestrator.
pub enum Ttl<A> {
    /// Every entry lives for the same duration.
    Fixed(Duration),
    /// Entries never expire.
    Persistent,
    /// Expiry computed from the call arguments; `None` means persistent.
    Dynamic(Arc<dyn Fn(&A) -> Option<Duration> + Send + Sync>),
}

impl<A> Ttl<A> {
    pub fn fixed_secs(secs: u64) -> Self {
        Ttl::Fixed(Duration::from_secs(secs))
    }

    pub fn dynamic(f: impl Fn(&A) -> Option<Duration> + Send + Sync + 'static) -> Self {
        Ttl::Dynamic(Arc::new(f))
    }

    /// Resolves the expiry for one call.
    pub fn resolve(&self, args: &A) -> Option<Duration> {
        match self {
            Ttl::Fixed(ttl) => Some(*ttl),
            Ttl::Persistent => None,
            Ttl::Dynamic(f) => f(args),
        }
    }
}

impl<A> Clone for Ttl<A> {
    fn clone(&self) -> Self {
        match self {
            Ttl::Fixed(ttl) => Ttl::Fixed(*ttl),
            Ttl::Persistent => Ttl::Persistent,
            Ttl::Dynamic(f) => Ttl::Dynamic(Arc::clone(f)),
        }
    }
}

impl<A> fmt::Debug for Ttl<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Fixed(ttl) => f.debug_tuple("Fixed").field(ttl).finish(),
            Ttl::Persistent => f.write_str("Persistent"),
            Ttl::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Where entries live in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// One top-level key per entry (`GET`/`MGET`/`SET`).
    Keys,
    /// One field per entry inside a single hash (`HGET`/`HSET`).
    /// Hash fields have no expiry, so the TTL policy is ignored.
    Hash { hash_key: String },
}

impl Layout {
    pub fn hash(hash_key: impl Into<String>) -> Self {
        Layout::Hash {
            hash_key: hash_key.into(),
        }
    }
}
