//! Process settings, read once at startup.
//!
//! Defaults are layered under environment variables prefixed with
//! `DASHCACHE`, using `__` to separate nested keys:
//!
//! | Variable | Setting |
//! |---|---|
//! | `DASHCACHE__SERVER__HOST` | bind address (default `0.0.0.0`) |
//! | `DASHCACHE__SERVER__PORT` | bind port (default `5200`) |
//! | `DASHCACHE__STORE__URL` | remote store URL; unset means in-process store |
//! | `DASHCACHE__STORE__PASSWORD` | remote store password |
//! | `DASHCACHE__STORE__POOL_SIZE` | connection pool size (default `20`) |
//! | `DASHCACHE__STORE__OPERATION_TIMEOUT` | per-operation timeout, e.g. `2s` |
//! | `DASHCACHE__CACHE__MEMORY_CAPACITY` | in-process store capacity |

use std::collections::HashMap;
use std::net::SocketAddr;

use config::{Config, ConfigError, Environment};
use dashcache_store::StoreConfig;
use serde::Deserialize;

const ENV_PREFIX: &str = "DASHCACHE";

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Message(format!("invalid server address: {}", e)))
    }
}

/// In-process cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Capacity of the in-process store used when no remote store is set.
    pub memory_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub cache: CacheSettings,
    /// Remote store; `None` selects the in-process store.
    #[serde(default)]
    pub store: Option<StoreConfig>,
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(None)
    }

    /// Loads settings from an explicit variable map instead of the process
    /// environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(Some(vars))
    }

    fn build(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5200)?
            .set_default("cache.memory_capacity", 10_000)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        if let Some(store) = &settings.store {
            store
                .validate()
                .map_err(|e| ConfigError::Message(e.to_string()))?;
        }

        Ok(settings)
    }
}
