//! Metrics module for the dashcache server.

pub mod cache;
pub mod ops;
pub mod setup;

pub use cache::{CacheMetrics, RaceWinner};
pub use setup::init_metrics;
