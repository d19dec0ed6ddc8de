//! Fixed-size content hash produced by a [`DigestAlgorithm`](crate::digest::DigestAlgorithm)

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte digest identifying a node's content
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Length of every hash in bytes
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Lowercase hex, 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the output of [`to_hex`](Self::to_hex)
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != Self::LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&bytes);
        Ok(Hash(out))
    }

    /// First 7 hex characters, for log fields
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
