//! Pluggable hashing for tree values
//!
//! A [`Digest`] pairs a [`DigestAlgorithm`] with a [`ValueSerializer`]:
//! the serializer turns a value into bytes, the algorithm turns bytes into
//! a fixed-size [`Hash`](crate::model::Hash). The default algorithm is BLAKE3.

mod algorithm;
mod serializer;

pub use algorithm::{DigestAlgorithm, NodeHasher};
pub use serializer::{BincodeSerializer, BytesSerializer, JsonSerializer, ValueSerializer};

use crate::model::Hash;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Hash function for the values stored in a tree
pub struct Digest<V> {
    algorithm: DigestAlgorithm,
    serializer: Arc<dyn ValueSerializer<V>>,
}

impl<V> Digest<V> {
    pub fn new(algorithm: DigestAlgorithm, serializer: impl ValueSerializer<V> + 'static) -> Self {
        Digest {
            algorithm,
            serializer: Arc::new(serializer),
        }
    }

    /// Digest using the default algorithm
    pub fn with_serializer(serializer: impl ValueSerializer<V> + 'static) -> Self {
        Self::new(DigestAlgorithm::default(), serializer)
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Serialize and hash a single value
    ///
    /// Serializer failures propagate unchanged.
    pub fn value_hash(&self, value: &V) -> Result<Hash> {
        let bytes = self.serializer.serialize(value)?;
        Ok(self.algorithm.digest(&bytes))
    }
}

impl<V> Clone for Digest<V> {
    fn clone(&self) -> Self {
        Digest {
            algorithm: self.algorithm,
            serializer: Arc::clone(&self.serializer),
        }
    }
}

impl<V> fmt::Debug for Digest<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Digest")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
