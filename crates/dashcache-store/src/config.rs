//! Remote store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Configuration for the remote key-value store.
///
/// Read once at process startup and treated as immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Store URL, `rediss://host:port` in deployed environments.
    url: String,

    /// Password (optional; injected into the URL at connect time).
    #[serde(default, skip_serializing)]
    password: Option<String>,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_size")]
    pool_size: usize,

    /// Time allowed to establish a new connection.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    connect_timeout: Duration,

    /// Time allowed for a single store operation, checkout included.
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    operation_timeout: Duration,

    /// Refuse plaintext URLs.
    #[serde(default)]
    require_tls: bool,
}

fn default_pool_size() -> usize {
    20
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(2)
}

impl StoreConfig {
    /// Creates a new builder for StoreConfig.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    pub fn require_tls(&self) -> bool {
        self.require_tls
    }

    /// Returns true if the URL selects a TLS connection.
    pub fn is_tls(&self) -> bool {
        self.url.starts_with("rediss://")
    }

    /// Returns `host:port` without scheme, credentials or database.
    pub fn endpoint(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        let rest = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
        rest.split('/').next().unwrap_or(rest)
    }

    /// Returns the first DNS label of the host, used as the telemetry target.
    pub fn account_name(&self) -> &str {
        let endpoint = self.endpoint();
        let host = endpoint.split(':').next().unwrap_or(endpoint);
        host.split('.').next().unwrap_or(host)
    }

    /// Returns the URL with the password injected, for the connection pool.
    pub fn connection_url(&self) -> String {
        match (&self.password, self.url.split_once("://")) {
            (Some(password), Some((scheme, rest))) if !rest.contains('@') => {
                format!("{}://:{}@{}", scheme, urlencoding::encode(password), rest)
            },
            _ => self.url.clone(),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), StoreError> {
        if !(self.url.starts_with("redis://") || self.url.starts_with("rediss://")) {
            return Err(StoreError::InvalidConfig(format!(
                "unsupported store URL scheme: {}",
                self.endpoint()
            )));
        }
        if self.endpoint().is_empty() {
            return Err(StoreError::InvalidConfig("store URL has no host".into()));
        }
        if self.pool_size == 0 {
            return Err(StoreError::InvalidConfig(
                "pool size must be at least 1".into(),
            ));
        }
        if self.require_tls && !self.is_tls() {
            return Err(StoreError::InvalidConfig(
                "TLS is required but the store URL is plaintext".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for StoreConfig.
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    url: Option<String>,
    password: Option<String>,
    pool_size: Option<usize>,
    connect_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
    require_tls: bool,
}

impl StoreConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = Some(size);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn require_tls(mut self, require: bool) -> Self {
        self.require_tls = require;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<StoreConfig, StoreError> {
        let config = StoreConfig {
            url: self
                .url
                .ok_or_else(|| StoreError::InvalidConfig("url is required".into()))?,
            password: self.password,
            pool_size: self.pool_size.unwrap_or_else(default_pool_size),
            connect_timeout: self.connect_timeout.unwrap_or_else(default_connect_timeout),
            operation_timeout: self
                .operation_timeout
                .unwrap_or_else(default_operation_timeout),
            require_tls: self.require_tls,
        };
        config.validate()?;
        Ok(config)
    }
}
