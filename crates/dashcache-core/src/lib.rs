//! Dashcache Core - cache keys and value codecs
//!
//! This crate provides the pure, I/O-free half of the cache-aside layer:
//! deterministic key derivation ([`GenericKey`], [`AreaKey`]) and the
//! codecs that turn backend results into stored bytes ([`ObjectCodec`],
//! [`TabularCodec`]).

pub mod codec;
pub mod error;
pub mod key;

pub use codec::{Codec, CodecKind, ColumnMapping, ObjectCodec, Table, TabularCodec};
pub use error::{CodecError, KeyError};
pub use key::{
    AreaKey, AreaQuery, AreaScope, CacheKey, CallArgs, GenericKey, KeyArg, KeySet, KeyStrategy,
    ToCallArgs,
};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
