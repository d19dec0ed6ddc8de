//! Core data model types for merkle_config

mod hash;
mod path;

pub use hash::Hash;
pub use path::Path;
