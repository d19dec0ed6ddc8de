//! Immutable tree nodes

use crate::digest::{Digest, DigestAlgorithm};
use crate::model::Hash;
use crate::Result;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Domain separator for node hashes
const NODE_TAG: &[u8] = b"mtnode";

const VALUE_ABSENT: u8 = 0x00;
const VALUE_PRESENT: u8 = 0x01;

/// A node in the merkle tree
///
/// Nodes never change after construction. A node's hash covers:
/// - whether it holds a value (so a valueless branch never collides with a
///   leaf holding an empty value)
/// - the digest of that value
/// - every child label and child hash, in sorted label order
///
/// The hash never depends on where the node sits in the tree, so identical
/// subtrees hash identically and can be shared between snapshots.
#[derive(Debug)]
pub struct Node<V> {
    value: Option<Arc<V>>,
    value_hash: Option<Hash>,
    children: BTreeMap<String, Arc<Node<V>>>,
    hash: Hash,
}

impl<V> Node<V> {
    /// Create a node, hashing `value` with `digest`
    ///
    /// Fails only if the digest's serializer fails.
    pub fn new(
        value: Option<V>,
        children: BTreeMap<String, Arc<Node<V>>>,
        digest: &Digest<V>,
    ) -> Result<Self> {
        let value_hash = value.as_ref().map(|v| digest.value_hash(v)).transpose()?;
        Ok(Self::from_parts(
            value.map(Arc::new),
            value_hash,
            children,
            digest.algorithm(),
        ))
    }

    /// A node with no value and no children
    pub fn empty(algorithm: DigestAlgorithm) -> Self {
        Self::from_parts(None, None, BTreeMap::new(), algorithm)
    }

    fn from_parts(
        value: Option<Arc<V>>,
        value_hash: Option<Hash>,
        children: BTreeMap<String, Arc<Node<V>>>,
        algorithm: DigestAlgorithm,
    ) -> Self {
        let hash = compute_hash(value_hash.as_ref(), &children, algorithm);
        Node {
            value,
            value_hash,
            children,
            hash,
        }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_deref()
    }

    /// Digest of the value alone (not of the node)
    pub fn value_hash(&self) -> Option<Hash> {
        self.value_hash
    }

    pub fn child(&self, label: &str) -> Option<&Arc<Node<V>>> {
        self.children.get(label)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Arc<Node<V>>)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// No value and no children
    pub fn is_vacant(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Walk down `path`, returning the node found there
    pub fn find<S: AsRef<str>>(self: &Arc<Self>, path: &[S]) -> Option<&Arc<Self>> {
        let mut node = self;
        for label in path {
            node = node.children.get(label.as_ref())?;
        }
        Some(node)
    }

    /// Replace (or add) the child under `label`
    ///
    /// Returns `self` when `child` is already the stored child, or when the
    /// resulting hash would not change.
    pub fn with_child(
        self: &Arc<Self>,
        label: &str,
        child: Arc<Node<V>>,
        algorithm: DigestAlgorithm,
    ) -> Arc<Self> {
        if let Some(existing) = self.children.get(label) {
            if Arc::ptr_eq(existing, &child) || existing.hash == child.hash {
                return Arc::clone(self);
            }
        }
        let mut children = self.children.clone();
        children.insert(label.to_string(), child);
        Arc::new(Self::from_parts(
            self.value.clone(),
            self.value_hash,
            children,
            algorithm,
        ))
    }

    /// Drop the child under `label`; `self` if there is none
    pub fn without_child(self: &Arc<Self>, label: &str, algorithm: DigestAlgorithm) -> Arc<Self> {
        if !self.children.contains_key(label) {
            return Arc::clone(self);
        }
        let mut children = self.children.clone();
        children.remove(label);
        Arc::new(Self::from_parts(
            self.value.clone(),
            self.value_hash,
            children,
            algorithm,
        ))
    }

    /// Set this node's value, keeping its children
    pub(crate) fn with_value(
        self: &Arc<Self>,
        value: V,
        value_hash: Hash,
        algorithm: DigestAlgorithm,
    ) -> Arc<Self> {
        if self.value_hash == Some(value_hash) {
            return Arc::clone(self);
        }
        Arc::new(Self::from_parts(
            Some(Arc::new(value)),
            Some(value_hash),
            self.children.clone(),
            algorithm,
        ))
    }

    /// Rebuild the path down to `path`, storing `value` there
    ///
    /// Missing intermediate nodes are created without values. Only nodes on
    /// the path are rebuilt; every sibling is reused as-is.
    pub(crate) fn set<S: AsRef<str>>(
        self: &Arc<Self>,
        path: &[S],
        value: V,
        value_hash: Hash,
        algorithm: DigestAlgorithm,
    ) -> Arc<Self> {
        let Some((head, tail)) = path.split_first() else {
            return self.with_value(value, value_hash, algorithm);
        };
        let label = head.as_ref();
        let new_child = match self.children.get(label) {
            Some(child) => child.set(tail, value, value_hash, algorithm),
            None => Arc::new(Self::empty(algorithm)).set(tail, value, value_hash, algorithm),
        };
        self.with_child(label, new_child, algorithm)
    }

    /// Rebuild the path down to `path` without the node found there
    ///
    /// Returns `None` when this node itself is left vacant and should be
    /// dropped by its parent.
    pub(crate) fn remove<S: AsRef<str>>(
        self: &Arc<Self>,
        path: &[S],
        algorithm: DigestAlgorithm,
    ) -> Option<Arc<Self>> {
        let Some((head, tail)) = path.split_first() else {
            return None;
        };
        let label = head.as_ref();
        let Some(child) = self.children.get(label) else {
            return Some(Arc::clone(self));
        };
        let updated = match child.remove(tail, algorithm) {
            Some(new_child) if Arc::ptr_eq(&new_child, child) => return Some(Arc::clone(self)),
            Some(new_child) => self.with_child(label, new_child, algorithm),
            None => self.without_child(label, algorithm),
        };
        if updated.is_vacant() {
            None
        } else {
            Some(updated)
        }
    }

    /// Depth-first visit of every valued node, children in label order
    pub(crate) fn collect_values<'a>(
        &'a self,
        prefix: &mut Vec<String>,
        out: &mut Vec<(Vec<String>, &'a V)>,
    ) {
        if let Some(value) = self.value.as_deref() {
            out.push((prefix.clone(), value));
        }
        for (label, child) in &self.children {
            prefix.push(label.clone());
            child.collect_values(prefix, out);
            prefix.pop();
        }
    }
}

fn compute_hash<V>(
    value_hash: Option<&Hash>,
    children: &BTreeMap<String, Arc<Node<V>>>,
    algorithm: DigestAlgorithm,
) -> Hash {
    let mut hasher = algorithm.hasher();
    hasher.update(NODE_TAG);
    match value_hash {
        Some(hash) => {
            hasher.update(&[VALUE_PRESENT]);
            hasher.update(hash.as_bytes());
        }
        None => {
            hasher.update(&[VALUE_ABSENT]);
        }
    }
    hasher.update(&(children.len() as u64).to_be_bytes());
    for (label, child) in children {
        hasher.update(&(label.len() as u64).to_be_bytes());
        hasher.update(label.as_bytes());
        hasher.update(child.hash.as_bytes());
    }
    hasher.finalize()
}

impl<V: fmt::Display> fmt::Display for Node<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(\"")?;
        if let Some(value) = &self.value {
            write!(f, "{}", value)?;
        }
        write!(f, "\" [")?;
        for (i, (label, child)) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", label, child)?;
        }
        write!(f, "])")
    }
}

impl<V: Serialize> Serialize for Node<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_struct("Node", 3)?;
        node.serialize_field("hash", &self.hash.to_hex())?;
        node.serialize_field("value", &self.value.as_deref())?;
        node.serialize_field("children", &Children(&self.children))?;
        node.end()
    }
}

struct Children<'a, V>(&'a BTreeMap<String, Arc<Node<V>>>);

impl<V: Serialize> Serialize for Children<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, child) in self.0 {
            map.serialize_entry(label, &**child)?;
        }
        map.end()
    }
}
