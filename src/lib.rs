//! # merkle_config
//!
//! Persistent, content-addressed configuration trees with subtree change
//! notification.
//!
//! A configuration snapshot is an immutable [`MerkleTree`]: every node's
//! hash covers its value and its children's hashes, unchanged subtrees are
//! shared between snapshots, and a mutation rebuilds only the path it
//! touches. A [`Registry`] holds the current snapshot and notifies listeners
//! when the subtree they watch changes, comparing one hash per watched path
//! per update regardless of how large the configuration is.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: immutable [`MerkleTree`]s built with repeated `add` calls
//! - **Digests**: pluggable value serializer plus hash algorithm (BLAKE3 by default)
//! - **Change detection**: per-path hash comparison, see [`detect_change`]
//! - **Listeners and streams**: callback and [`futures::Stream`] views of the same dispatch
//!
//! ## Example
//!
//! ```
//! use merkle_config::{MerkleTree, Registry, SubtreeChange};
//!
//! let registry = Registry::new();
//! registry.listen(["collector", "listenPort"], |change: &SubtreeChange<String>| {
//!     println!("port is now {:?}", change.value());
//! });
//!
//! let config = MerkleTree::empty_bytes()
//!     .add("8080".to_string(), &["collector", "listenPort"])?;
//! registry.update(config);
//! # Ok::<(), merkle_config::Error>(())
//! ```

pub mod digest;
pub mod model;
pub mod ops;
pub mod registry;
pub mod trie;

mod error;

pub use digest::{
    BincodeSerializer, BytesSerializer, Digest, DigestAlgorithm, JsonSerializer, ValueSerializer,
};
pub use error::{Error, Result};
pub use model::{Hash, Path};
pub use ops::{detect_change, diff_trees, Change, Diff, DiffEntry, SubtreeChange};
pub use registry::{
    ListenerId, Registry, Settings, SubtreeChanges, TreeChangeListener, UpdateSummary,
};
pub use trie::{MerkleTree, Node};
