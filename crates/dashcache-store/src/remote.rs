//! Remote store backed by a pooled Redis connection.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime, Timeouts};
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::client::{StoreClient, StoreResult};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::telemetry::Dependency;

/// Redis-compatible store client.
///
/// Holds a connection pool shared by all callers. Each operation checks out
/// one connection and must finish within the configured operation timeout,
/// checkout included.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    target: String,
    endpoint: String,
    operation_timeout: Duration,
}

impl RedisStore {
    /// Builds the connection pool. No connection is opened until first use.
    pub fn connect(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        if !config.is_tls() {
            warn!(
                endpoint = %config.endpoint(),
                "Store connection is not encrypted"
            );
        }

        let mut pool_config = Config::from_url(config.connection_url());
        pool_config.pool = Some(PoolConfig {
            max_size: config.pool_size(),
            timeouts: Timeouts {
                wait: Some(config.operation_timeout()),
                create: Some(config.connect_timeout()),
                recycle: Some(config.operation_timeout()),
            },
            ..Default::default()
        });

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        info!(
            endpoint = %config.endpoint(),
            pool_size = config.pool_size(),
            "Store connection pool created"
        );

        Ok(Self {
            pool,
            target: config.account_name().to_string(),
            endpoint: config.endpoint().to_string(),
            operation_timeout: config.operation_timeout(),
        })
    }

    /// Closes the pool. Pending checkouts fail afterwards.
    pub fn close(&self) {
        self.pool.close();
        info!(endpoint = %self.endpoint, "Store connection pool closed");
    }

    /// Runs `op` on a pooled connection within the operation timeout.
    async fn with_connection<T, F, Fut>(&self, operation: &'static str, op: F) -> StoreResult<T>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let work = async {
            let conn = self.pool.get().await?;
            op(conn).await
        };

        tokio::time::timeout(self.operation_timeout, work)
            .await
            .map_err(|_| StoreError::timeout(operation, self.operation_timeout))?
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("target", &self.target)
            .field("endpoint", &self.endpoint)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl Dependency for RedisStore {
    fn dependency_type(&self) -> &str {
        "Redis"
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![("url", self.endpoint.clone())]
    }
}

#[async_trait]
impl StoreClient for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.with_connection("GET", |mut conn| async move {
            let value: Option<Vec<u8>> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.with_connection("SET", |mut conn| async move {
            match ttl {
                Some(ttl) => {
                    let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
                },
                None => {
                    let _: () = conn.set(key, value).await?;
                },
            }
            Ok(())
        })
        .await
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        self.with_connection("MGET", |mut conn| async move {
            let values: Vec<Option<Vec<u8>>> =
                redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;

            if values.len() != keys.len() {
                return Err(StoreError::Protocol(format!(
                    "MGET returned {} values for {} keys",
                    values.len(),
                    keys.len()
                )));
            }
            Ok(values)
        })
        .await
    }

    async fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        self.with_connection("HGET", |mut conn| async move {
            let value: Option<Vec<u8>> = conn.hget(hash, field).await?;
            Ok(value)
        })
        .await
    }

    async fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        self.with_connection("HSET", |mut conn| async move {
            let _: () = conn.hset(hash, field, value).await?;
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> StoreResult<String> {
        self.with_connection("PING", |mut conn| async move {
            let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(reply)
        })
        .await
    }
}
