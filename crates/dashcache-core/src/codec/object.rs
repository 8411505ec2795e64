use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{Codec, CodecKind};
use crate::error::CodecError;

/// Opaque codec for any serde value graph, stored in `bincode`'s compact
/// binary format.
///
/// Floats are written bit for bit (`NaN` and infinities included) and map
/// keys keep their own type. Values must not rely on self-describing
/// formats (`#[serde(untagged)]`, `serde_json::Value`).
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use dashcache_core::codec::{Codec, ObjectCodec};
///
/// let codec = ObjectCodec::<BTreeMap<String, Vec<u32>>>::new();
/// let mut value = BTreeMap::new();
/// value.insert("cases".to_string(), vec![1, 2, 3]);
///
/// let bytes = codec.encode(&value).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), value);
/// ```
pub struct ObjectCodec<T> {
    _value: PhantomData<fn() -> T>,
}

impl<T> ObjectCodec<T> {
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T> Default for ObjectCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ObjectCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ObjectCodec<T> {}

impl<T> fmt::Debug for ObjectCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCodec")
            .field("value", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Codec for ObjectCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(value).map_err(CodecError::ObjectEncode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        bincode::deserialize(bytes).map_err(CodecError::ObjectDecode)
    }

    fn kind(&self) -> CodecKind {
        CodecKind::Object
    }
}
