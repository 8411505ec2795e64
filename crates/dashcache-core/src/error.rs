//! Error types for key derivation and value codecs.
//!
//! Both error families are local to the cache layer: a [`KeyError`] is
//! surfaced to the caller before any store I/O happens, while a
//! [`CodecError`] on decode is recovered by the orchestrator as a miss.
//!
//! # Example
//!
//! ```
//! use dashcache_core::KeyError;
//!
//! let error = KeyError::invalid_date("04/01/2021", "expected YYYY-MM-DD");
//! assert!(error.to_string().contains("04/01/2021"));
//! ```

use thiserror::Error;

/// Failure to derive a cache key from call arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The date argument could not be normalized to an ISO date.
    #[error("Invalid date '{value}': {reason}")]
    InvalidDate {
        /// The raw value supplied by the caller
        value: String,
        /// Why it could not be parsed
        reason: String,
    },

    /// The area identifier is missing or blank.
    #[error("Invalid area identifier '{value}': {reason}")]
    InvalidArea {
        /// The raw value supplied by the caller
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The namespace prefix is empty.
    #[error("Cache key prefix cannot be empty")]
    EmptyPrefix,

    /// A fan-out call was made with no elements.
    #[error("Cannot derive keys for an empty argument list")]
    EmptyFanOut,
}

impl KeyError {
    /// Creates an InvalidDate error.
    pub fn invalid_date(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidArea error.
    pub fn invalid_area(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArea {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to encode or decode a cached payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value could not be serialized.
    #[error("Failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    /// The payload could not be deserialized.
    #[error("Failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// The value could not be written in the binary object format.
    #[error("Failed to encode object: {0}")]
    ObjectEncode(#[source] bincode::Error),

    /// The payload is not a valid binary object for the expected type.
    #[error("Failed to decode object: {0}")]
    ObjectDecode(#[source] bincode::Error),

    /// The payload was written under a different column mapping.
    #[error("Column mapping version mismatch: payload v{found}, codec v{expected}")]
    VersionMismatch {
        /// Version the codec was built with
        expected: u32,
        /// Version found in the payload
        found: u32,
    },

    /// A row does not have the same width as the header.
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Index of the offending row
        row: usize,
        /// Number of columns in the header
        expected: usize,
        /// Number of cells in the row
        found: usize,
    },

    /// A public column name clashes with a storage-side name of another column.
    #[error("Column '{column}' collides with the storage name of '{owner}'")]
    ColumnCollision {
        /// Column found in the table
        column: String,
        /// Public column that owns that storage name
        owner: String,
    },
}

impl CodecError {
    /// Returns true if the payload is unreadable under the current schema,
    /// as opposed to the value being unencodable.
    pub fn is_decode_side(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::ObjectDecode(_)
                | Self::VersionMismatch { .. }
                | Self::RaggedRow { .. }
        )
    }
}
