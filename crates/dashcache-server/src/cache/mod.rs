//! Cache-aside orchestration.
//!
//! This module ties a key strategy, a codec and a store client into one
//! cache-aside contract:
//! - `get_or_fetch`: single entry, fetch on miss
//! - `get_or_fetch_many`: one entry per element, fetch only what is missing
//! - `race_fill`: cache probe and backend fetch race, first answer wins

mod aside;
mod fanout;
mod policy;
mod race;

pub use aside::{CacheAside, CacheAsideError};
pub use policy::{Layout, Ttl};
