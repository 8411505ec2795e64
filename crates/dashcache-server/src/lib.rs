//! Dashcache Server - cache-aside orchestration and ops surface
//!
//! The [`cache`] module is the library half: [`CacheAside`] combines a key
//! strategy, a codec and a store client. The rest of the crate is the HTTP
//! ops surface (`/health`, `/healthcheck`, `/metrics`) served by the binary.

pub mod cache;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod settings;
pub mod state;

pub use cache::{CacheAside, CacheAsideError, Layout, Ttl};
pub use error::AppError;
pub use server::{create_router, run_server};
pub use settings::Settings;
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
