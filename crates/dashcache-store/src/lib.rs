//! Instrumented key-value store clients.
//!
//! This crate provides:
//! - [`telemetry`]: the uniform dependency span wrapper for any backing call
//! - [`StoreClient`]: the asynchronous store contract used by the cache layer
//! - [`RedisStore`]: pooled Redis client
//! - [`MemoryStore`]: in-process store for local runs and tests
//! - [`Instrumented`]: decorator emitting one span per store operation

pub mod client;
pub mod config;
pub mod error;
pub mod instrumented;
pub mod memory;
pub mod remote;
pub mod telemetry;

pub use client::{StoreClient, StoreResult};
pub use config::{StoreConfig, StoreConfigBuilder};
pub use error::StoreError;
pub use instrumented::Instrumented;
pub use memory::MemoryStore;
pub use remote::RedisStore;
pub use telemetry::{CallContext, Dependency, QueryArg, format_query, traced, traced_with};
