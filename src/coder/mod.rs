//! Element coders and round-trip normalization.
//!
//! Every [`PCollection`](crate::pipeline::PCollection) carries a [`Coder`].
//! Before an equality-based check, each element is encoded and decoded again
//! so that it is compared in the same shape it would have after crossing a
//! serialization boundary inside the runner.
//!
//! - [`BincodeCoder`] - compact binary encoding (the default)
//! - [`JsonCoder`] - JSON encoding; lossy for some types
//! - [`round_trip`] / [`round_trip_all`] - normalization helpers

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Encodes and decodes elements of a collection.
pub trait Coder<T>: Send + Sync {
    /// Short name used in error messages.
    fn name(&self) -> &str;

    /// Encode a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if the value cannot be encoded.
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a value from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if the bytes are not a valid encoding.
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// Binary coder backed by `bincode`.
pub struct BincodeCoder<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> BincodeCoder<T> {
    /// Create a bincode coder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for BincodeCoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeCoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeCoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BincodeCoder")
    }
}

impl<T: Serialize + DeserializeOwned> Coder<T> for BincodeCoder<T> {
    fn name(&self) -> &str {
        "bincode"
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| Error::codec(self.name(), e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| Error::codec(self.name(), e))
    }
}

/// JSON coder backed by `serde_json`.
///
/// JSON canonicalizes some values (for example `f32` is widened through its
/// decimal representation) and rejects others (non-finite floats, maps with
/// non-string keys), which makes it useful for exercising normalization.
pub struct JsonCoder<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> JsonCoder<T> {
    /// Create a JSON coder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for JsonCoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCoder")
    }
}

impl<T: Serialize + DeserializeOwned> Coder<T> for JsonCoder<T> {
    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::codec(self.name(), e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::codec(self.name(), e))
    }
}

/// Encode then decode a single value.
///
/// # Errors
///
/// Propagates the coder's error unchanged.
pub fn round_trip<T>(coder: &dyn Coder<T>, value: &T) -> Result<T> {
    let bytes = coder.encode(value)?;
    coder.decode(&bytes)
}

/// Encode then decode every value, stopping at the first failure.
///
/// # Errors
///
/// Returns the first coder error encountered.
pub fn round_trip_all<T>(coder: &dyn Coder<T>, values: &[T]) -> Result<Vec<T>> {
    values
        .iter()
        .map(|v| round_trip(coder, v))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| {
            tracing::trace!(coder = coder.name(), error = %e, "round-trip normalization failed");
            e
        })
}
