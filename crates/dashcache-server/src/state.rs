//! Application state.

use std::sync::Arc;

use dashcache_store::StoreClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The store backing the cache-aside layer.
    store: Arc<dyn StoreClient>,
    /// Every dependency reported by `/healthcheck`, the store included.
    dependencies: Arc<Vec<Arc<dyn StoreClient>>>,
}

impl AppState {
    /// Creates a new AppState around the given store.
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            dependencies: Arc::new(vec![Arc::clone(&store)]),
            store,
        }
    }

    /// Registers another dependency for health checks.
    pub fn with_dependency(mut self, dependency: Arc<dyn StoreClient>) -> Self {
        Arc::make_mut(&mut self.dependencies).push(dependency);
        self
    }

    /// Returns the shared store.
    pub fn store(&self) -> Arc<dyn StoreClient> {
        Arc::clone(&self.store)
    }

    pub fn dependencies(&self) -> &[Arc<dyn StoreClient>] {
        &self.dependencies
    }
}
