//! Error types for store clients.

use std::time::Duration;

/// Errors that can occur when talking to a key-value store.
///
/// A failed read is always one of these, never an empty result: callers
/// decide whether to degrade or fail.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or dropped the connection.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// An operation did not complete within the configured timeout.
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// No connection could be checked out of the pool.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// The store replied with something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Creates a new unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::Pool(_)
        )
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_timeout()
            || error.is_io_error()
            || error.is_connection_refusal()
            || error.is_connection_dropped()
        {
            Self::unavailable(error.to_string())
        } else {
            Self::Protocol(error.to_string())
        }
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(error: deadpool_redis::PoolError) -> Self {
        match error {
            deadpool_redis::PoolError::Timeout(_) => {
                Self::Pool("timed out waiting for a connection".into())
            },
            deadpool_redis::PoolError::Backend(inner) => inner.into(),
            other => Self::Pool(other.to_string()),
        }
    }
}
