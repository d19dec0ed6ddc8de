//! Value serializers

use crate::Result;
use serde::Serialize;

/// Turns a tree value into the bytes that get hashed
///
/// Implementations can be:
/// - Raw byte views for string-like values
/// - serde-based encodings for structured values
/// - Closures for anything custom
pub trait ValueSerializer<V>: Send + Sync {
    fn serialize(&self, value: &V) -> Result<Vec<u8>>;
}

impl<V, F> ValueSerializer<V> for F
where
    F: Fn(&V) -> Result<Vec<u8>> + Send + Sync,
{
    fn serialize(&self, value: &V) -> Result<Vec<u8>> {
        self(value)
    }
}

/// Uses the value's own bytes (`String`, `&str`, `Vec<u8>`, ...)
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesSerializer;

impl<V: AsRef<[u8]>> ValueSerializer<V> for BytesSerializer {
    fn serialize(&self, value: &V) -> Result<Vec<u8>> {
        Ok(value.as_ref().to_vec())
    }
}

/// Encodes values with bincode
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeSerializer;

impl<V: Serialize> ValueSerializer<V> for BincodeSerializer {
    fn serialize(&self, value: &V) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }
}

/// Encodes values as compact JSON
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl<V: Serialize> ValueSerializer<V> for JsonSerializer {
    fn serialize(&self, value: &V) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }
}
