//! Fixtures de datos para los tests del orquestador.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use dashcache_core::{AreaKey, AreaQuery, Table, TabularCodec};
use dashcache_server::{CacheAside, Ttl};
use dashcache_store::MemoryStore;
use serde_json::json;

pub const AREA_TTL: Duration = Duration::from_secs(180 * 24 * 60 * 60);

pub type AreaCache = CacheAside<AreaQuery, AreaKey, TabularCodec>;

/// Orquestador del namespace AREA sobre un MemoryStore.
pub fn area_cache(store: &MemoryStore) -> AreaCache {
    CacheAside::new(
        Arc::new(store.clone()),
        "AREA",
        AreaKey::new("AREA::"),
        TabularCodec::default(),
    )
    .with_ttl(Ttl::Fixed(AREA_TTL))
}

/// Filas que devolveria la base de datos para un area y fecha.
pub fn area_rows(query: &AreaQuery) -> Table {
    Table::new(["date", "areaCode", "areaName", "newCases"])
        .with_row(vec![
            json!(query.date.clone()),
            json!("K02000001"),
            json!("United Kingdom"),
            json!(58784),
        ])
        .expect("fixture row matches the header")
}

/// Cuenta las llamadas al backend.
#[derive(Clone, Default)]
pub struct FetchCounter(Arc<AtomicU32>);

impl FetchCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
