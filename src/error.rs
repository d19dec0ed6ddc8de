//! Error types for merkle_config

use thiserror::Error;

/// Result type alias for merkle_config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in merkle_config operations
///
/// Lookups never produce errors: a missing path is `None`. Only mutations
/// and value serialization can fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Digest error: {0}")]
    Digest(String),

    #[error("Config error: {0}")]
    Config(String),
}
