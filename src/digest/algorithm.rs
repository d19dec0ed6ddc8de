//! Hash algorithms

use crate::model::Hash;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// Algorithm used for both value and node hashes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl DigestAlgorithm {
    /// Start an incremental hash
    pub fn hasher(&self) -> NodeHasher {
        match self {
            DigestAlgorithm::Blake3 => NodeHasher::Blake3(Box::new(blake3::Hasher::new())),
            DigestAlgorithm::Sha256 => NodeHasher::Sha256(Sha256::new()),
        }
    }

    /// Hash arbitrary data
    pub fn digest(&self, data: &[u8]) -> Hash {
        self.digest_many(&[data])
    }

    /// Hash multiple pieces of data
    pub fn digest_many(&self, parts: &[&[u8]]) -> Hash {
        let mut hasher = self.hasher();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize()
    }

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Blake3 => "blake3",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(DigestAlgorithm::Blake3),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(crate::Error::Config(format!(
                "unknown digest algorithm: {}",
                other
            ))),
        }
    }
}

/// Incremental hasher for one of the supported algorithms
pub enum NodeHasher {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
}

impl NodeHasher {
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        match self {
            NodeHasher::Blake3(h) => {
                h.update(data);
            }
            NodeHasher::Sha256(h) => h.update(data),
        }
        self
    }

    pub fn finalize(self) -> Hash {
        match self {
            NodeHasher::Blake3(h) => Hash::from_bytes(*h.finalize().as_bytes()),
            NodeHasher::Sha256(h) => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&h.finalize());
                Hash::from_bytes(out)
            }
        }
    }
}
