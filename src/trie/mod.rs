//! Persistent merkle tree with structural sharing
//!
//! This implements a content-addressed tree where:
//! - Each node's hash is derived from its value digest and its children's hashes
//! - Unchanged subtrees are shared between snapshots, never copied
//! - Only the nodes on a modified path are rebuilt

mod node;
mod tree;

pub use node::Node;
pub use tree::MerkleTree;
