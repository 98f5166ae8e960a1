//! # Serializer Capability
//!
//! Byte encoding for keys, hash fields and values. The façade only talks to
//! the [`Serializer`] trait, so any format can be plugged in.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{CacheError, Result};

/// Encodes keys, fields and values to bytes and back.
pub trait Serializer: Send + Sync + 'static {
    /// Key names are stored as raw UTF-8 by default.
    fn encode_key(&self, key: &str) -> Vec<u8> {
        key.as_bytes().to_vec()
    }

    fn decode_key(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Hash fields share the key encoding so `hkeys` decodes what `hset` wrote.
    fn encode_field(&self, field: &str) -> Vec<u8> {
        self.encode_key(field)
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Decode an optional reply. Missing and empty payloads are absent.
    fn decode_opt<T: DeserializeOwned>(&self, bytes: Option<&[u8]>) -> Result<Option<T>> {
        match bytes {
            Some(b) if !b.is_empty() => self.decode(b).map(Some),
            _ => Ok(None),
        }
    }

    fn decode_all<T: DeserializeOwned>(&self, items: &[Vec<u8>]) -> Result<Vec<T>> {
        items
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| self.decode(b))
            .collect()
    }
}

/// JSON values via `serde_json`. The default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Compact binary values via `bincode`.
///
/// Not self-describing: readers must decode with the exact type the writer used.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }
}
