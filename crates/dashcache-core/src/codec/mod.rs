use crate::error::CodecError;

pub mod object;
pub mod tabular;

pub use object::ObjectCodec;
pub use tabular::{ColumnMapping, DASHBOARD_COLUMNS, Table, TabularCodec};

/// Supported codec families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Object,
    Tabular,
}

impl CodecKind {
    /// Returns the label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecKind::Object => "object",
            CodecKind::Tabular => "tabular",
        }
    }
}

/// A stateless pair of encode/decode functions between a value and bytes.
pub trait Codec: Send + Sync {
    /// The in-memory value this codec round-trips.
    type Value;

    /// Serializes the value into its stored representation.
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError>;

    /// Restores a value from its stored representation.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError>;

    /// Which family this codec belongs to.
    fn kind(&self) -> CodecKind;
}
