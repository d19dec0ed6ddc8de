//! Persistent merkle tree of configuration values

use super::Node;
use crate::digest::{BytesSerializer, Digest, DigestAlgorithm, ValueSerializer};
use crate::model::{Hash, Path};
use crate::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// An immutable merkle tree keyed by label paths
///
/// Every mutator returns a new tree and leaves `self` untouched. The new
/// tree shares every subtree off the modified path with the old one, so a
/// `MerkleTree` is cheap to clone and safe to hand to any number of readers
/// on any thread.
///
/// Identity: a mutation that changes nothing returns a tree sharing the
/// very same root node (see [`MerkleTree::ptr_eq`]).
pub struct MerkleTree<V> {
    digest: Digest<V>,
    root: Arc<Node<V>>,
}

impl<V> MerkleTree<V> {
    /// Create an empty tree hashing values with `digest`
    pub fn empty(digest: Digest<V>) -> Self {
        let root = Arc::new(Node::empty(digest.algorithm()));
        MerkleTree { digest, root }
    }

    /// Create an empty tree using the default algorithm
    pub fn empty_with_digest(serializer: impl ValueSerializer<V> + 'static) -> Self {
        Self::empty(Digest::with_serializer(serializer))
    }

    pub fn empty_with_algorithm(
        algorithm: DigestAlgorithm,
        serializer: impl ValueSerializer<V> + 'static,
    ) -> Self {
        Self::empty(Digest::new(algorithm, serializer))
    }

    /// Build a tree from `(path, value)` pairs, applied in order
    pub fn from_entries<P, S, I>(digest: Digest<V>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, V)>,
        P: AsRef<[S]>,
        S: AsRef<str>,
    {
        entries
            .into_iter()
            .try_fold(Self::empty(digest), |tree, (path, value)| {
                tree.add(value, path.as_ref())
            })
    }

    pub fn digest(&self) -> &Digest<V> {
        &self.digest
    }

    /// Assign `value` to the node at `path`
    ///
    /// Missing intermediate nodes are created. Children of an existing node
    /// are kept. Returns `self` (same root) when the value is already there.
    pub fn add<S: AsRef<str>>(&self, value: V, path: &[S]) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidPath(
                "cannot assign a value to the root".to_string(),
            ));
        }
        let value_hash = self.digest.value_hash(&value)?;
        let root = self
            .root
            .set(path, value, value_hash, self.digest.algorithm());
        Ok(self.with_root(root))
    }

    /// Drop the node at `path` together with its subtree
    ///
    /// Ancestors left with neither a value nor children are dropped too.
    /// Returns `self` (same root) when nothing is stored at `path`.
    pub fn remove<S: AsRef<str>>(&self, path: &[S]) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidPath("cannot remove the root".to_string()));
        }
        let algorithm = self.digest.algorithm();
        let root = self
            .root
            .remove(path, algorithm)
            .unwrap_or_else(|| Arc::new(Node::empty(algorithm)));
        Ok(self.with_root(root))
    }

    fn with_root(&self, root: Arc<Node<V>>) -> Self {
        if Arc::ptr_eq(&root, &self.root) {
            return self.clone();
        }
        MerkleTree {
            digest: self.digest.clone(),
            root,
        }
    }

    /// Value held by the root node
    pub fn value(&self) -> Option<&V> {
        self.root.value()
    }

    /// Value at exactly `path`; `None` if the node is missing or valueless
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&V> {
        self.root.find(path).and_then(|node| node.value())
    }

    /// The tree rooted at the node found at `path`
    pub fn subtree<S: AsRef<str>>(&self, path: &[S]) -> Option<Self> {
        self.root.find(path).map(|node| MerkleTree {
            digest: self.digest.clone(),
            root: Arc::clone(node),
        })
    }

    /// Node at `path`, for inspecting structure and sharing
    pub fn node<S: AsRef<str>>(&self, path: &[S]) -> Option<&Arc<Node<V>>> {
        self.root.find(path)
    }

    pub fn root(&self) -> &Arc<Node<V>> {
        &self.root
    }

    /// Hash of the root node
    pub fn hash(&self) -> Hash {
        self.root.hash()
    }

    pub fn hash_of<S: AsRef<str>>(&self, path: &[S]) -> Option<Hash> {
        self.root.find(path).map(|node| node.hash())
    }

    /// Whether the node at `path` is identical in `self` and `other`
    ///
    /// A path missing from both trees counts as identical.
    pub fn is_same<S: AsRef<str>>(&self, other: &MerkleTree<V>, path: &[S]) -> bool {
        self.hash_of(path) == other.hash_of(path)
    }

    /// Whether both trees share the same root node instance
    pub fn ptr_eq(a: &MerkleTree<V>, b: &MerkleTree<V>) -> bool {
        Arc::ptr_eq(&a.root, &b.root)
    }

    /// Every valued node with its path, in sorted path order
    pub fn entries(&self) -> Vec<(Path, &V)> {
        let mut out = Vec::new();
        self.root.collect_values(&mut Vec::new(), &mut out);
        out.into_iter()
            .map(|(path, value)| (Path::from(path), value))
            .collect()
    }

    /// Number of valued nodes
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_vacant()
    }
}

impl<V: AsRef<[u8]>> MerkleTree<V> {
    /// Empty tree for byte-like values, hashed as their raw bytes
    pub fn empty_bytes() -> Self {
        Self::empty_with_digest(BytesSerializer)
    }
}

impl<V> Clone for MerkleTree<V> {
    fn clone(&self) -> Self {
        MerkleTree {
            digest: self.digest.clone(),
            root: Arc::clone(&self.root),
        }
    }
}

impl<V> PartialEq for MerkleTree<V> {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl<V> Eq for MerkleTree<V> {}

impl<V: fmt::Debug> fmt::Debug for MerkleTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("hash", &self.hash())
            .field("algorithm", &self.digest.algorithm())
            .field("root", &self.root)
            .finish()
    }
}

impl<V: fmt::Display> fmt::Display for MerkleTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

impl<V: Serialize> Serialize for MerkleTree<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}
