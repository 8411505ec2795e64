//! Dashcache server binary.

use std::sync::Arc;

use anyhow::Context;
use dashcache_server::{AppState, Settings, create_router, metrics::init_metrics, run_server};
use dashcache_store::{Instrumented, MemoryStore, RedisStore, StoreClient};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // LOG_FORMAT=json para los agregadores de logs
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::load().context("failed to load settings")?;
    let addr = settings.server.addr()?;

    tracing::info!("Starting dashcache server v{}", env!("CARGO_PKG_VERSION"));

    let prometheus = init_metrics().context("failed to install metrics recorder")?;

    let mut remote = None;
    let store: Arc<dyn StoreClient> = match &settings.store {
        Some(config) => {
            let redis = RedisStore::connect(config).context("failed to create store pool")?;
            tracing::info!(store = %config.account_name(), "Using remote store");
            remote = Some(redis.clone());
            Arc::new(Instrumented::new(redis))
        },
        None => {
            tracing::warn!(
                capacity = settings.cache.memory_capacity,
                "DASHCACHE__STORE__URL not set, using in-process store"
            );
            Arc::new(Instrumented::new(MemoryStore::new(
                settings.cache.memory_capacity,
            )))
        },
    };

    let app = create_router(AppState::new(store), Some(prometheus));
    run_server(addr, app).await?;

    if let Some(redis) = remote {
        redis.close();
    }

    Ok(())
}
