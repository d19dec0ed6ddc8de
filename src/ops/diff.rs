//! Change detection between tree snapshots

use crate::model::{Hash, Path};
use crate::trie::{MerkleTree, Node};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// New state of a watched subtree after a change
pub enum SubtreeChange<V> {
    /// The subtree now looks like this
    Present(MerkleTree<V>),
    /// The branch was removed
    Absent,
}

impl<V> SubtreeChange<V> {
    pub fn subtree(&self) -> Option<&MerkleTree<V>> {
        match self {
            SubtreeChange::Present(tree) => Some(tree),
            SubtreeChange::Absent => None,
        }
    }

    pub fn into_subtree(self) -> Option<MerkleTree<V>> {
        match self {
            SubtreeChange::Present(tree) => Some(tree),
            SubtreeChange::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, SubtreeChange::Present(_))
    }

    /// Value at `path` relative to the changed subtree
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&V> {
        self.subtree().and_then(|tree| tree.get(path))
    }

    /// Value held by the subtree's root node
    pub fn value(&self) -> Option<&V> {
        self.subtree().and_then(|tree| tree.value())
    }

    pub fn hash(&self) -> Option<Hash> {
        self.subtree().map(|tree| tree.hash())
    }
}

impl<V> From<Option<MerkleTree<V>>> for SubtreeChange<V> {
    fn from(subtree: Option<MerkleTree<V>>) -> Self {
        match subtree {
            Some(tree) => SubtreeChange::Present(tree),
            None => SubtreeChange::Absent,
        }
    }
}

impl<V> Clone for SubtreeChange<V> {
    fn clone(&self) -> Self {
        match self {
            SubtreeChange::Present(tree) => SubtreeChange::Present(tree.clone()),
            SubtreeChange::Absent => SubtreeChange::Absent,
        }
    }
}

impl<V> fmt::Debug for SubtreeChange<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubtreeChange::Present(tree) => write!(f, "Present({:?})", tree.hash()),
            SubtreeChange::Absent => write!(f, "Absent"),
        }
    }
}

/// Result of comparing one watched path across two snapshots
#[derive(Debug, Clone)]
pub enum Change<V> {
    Unchanged,
    Changed(SubtreeChange<V>),
}

impl<V> Change<V> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Change::Changed(_))
    }
}

/// Compare `previous` and `current` at `path` using only hash lookups
///
/// With no previous snapshot the current subtree is reported as changed if
/// it exists (initial delivery). Otherwise the node hashes at `path` are
/// compared and nothing below `path` is visited, so the cost is one walk of
/// `path` per snapshot no matter how large the trees are.
pub fn detect_change<V, S: AsRef<str>>(
    previous: Option<&MerkleTree<V>>,
    current: &MerkleTree<V>,
    path: &[S],
) -> Change<V> {
    let Some(previous) = previous else {
        return match current.subtree(path) {
            Some(subtree) => Change::Changed(SubtreeChange::Present(subtree)),
            None => Change::Unchanged,
        };
    };

    if MerkleTree::ptr_eq(previous, current) || previous.is_same(current, path) {
        return Change::Unchanged;
    }

    Change::Changed(current.subtree(path).into())
}

/// Type of change in a diff
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffEntry {
    /// Value was added
    Added { path: Path, new_hash: Hash },
    /// Value was removed
    Removed { path: Path, old_hash: Hash },
    /// Value was modified
    Modified {
        path: Path,
        old_hash: Hash,
        new_hash: Hash,
    },
}

impl DiffEntry {
    pub fn path(&self) -> &Path {
        match self {
            DiffEntry::Added { path, .. } => path,
            DiffEntry::Removed { path, .. } => path,
            DiffEntry::Modified { path, .. } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DiffEntry::Added { .. } => "added",
            DiffEntry::Removed { .. } => "removed",
            DiffEntry::Modified { .. } => "modified",
        }
    }
}

/// A diff between two tree states
#[derive(Clone, Debug, Default)]
pub struct Diff {
    pub entries: Vec<DiffEntry>,
}

impl Diff {
    pub fn new(entries: Vec<DiffEntry>) -> Self {
        Diff { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn added_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, DiffEntry::Added { .. }))
            .count()
    }

    pub fn removed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, DiffEntry::Removed { .. }))
            .count()
    }

    pub fn modified_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, DiffEntry::Modified { .. }))
            .count()
    }

    /// Entries at or below `prefix`
    pub fn under<'a, S: AsRef<str>>(
        &'a self,
        prefix: &'a [S],
    ) -> impl Iterator<Item = &'a DiffEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.path().starts_with(prefix))
    }
}

/// Compute the value-level diff between two trees
///
/// Subtrees whose hashes match are skipped entirely, so the walk only
/// touches the region that actually changed.
pub fn diff_trees<V>(old: &MerkleTree<V>, new: &MerkleTree<V>) -> Diff {
    let mut entries = Vec::new();
    diff_nodes(
        Some(old.root()),
        Some(new.root()),
        &mut Vec::new(),
        &mut entries,
    );

    // Sort entries for determinism
    entries.sort_by(|a, b| a.path().cmp(b.path()));
    Diff::new(entries)
}

fn diff_nodes<V>(
    old: Option<&Arc<Node<V>>>,
    new: Option<&Arc<Node<V>>>,
    path: &mut Vec<String>,
    entries: &mut Vec<DiffEntry>,
) {
    if let (Some(o), Some(n)) = (old, new) {
        if o.hash() == n.hash() {
            return;
        }
    }

    let old_value = old.and_then(|n| n.value_hash());
    let new_value = new.and_then(|n| n.value_hash());
    match (old_value, new_value) {
        (None, Some(new_hash)) => entries.push(DiffEntry::Added {
            path: Path::from(path.clone()),
            new_hash,
        }),
        (Some(old_hash), None) => entries.push(DiffEntry::Removed {
            path: Path::from(path.clone()),
            old_hash,
        }),
        (Some(old_hash), Some(new_hash)) if old_hash != new_hash => {
            entries.push(DiffEntry::Modified {
                path: Path::from(path.clone()),
                old_hash,
                new_hash,
            })
        }
        _ => {} // Unchanged
    }

    let labels: BTreeSet<&str> = old
        .into_iter()
        .chain(new)
        .flat_map(|node| node.children().map(|(label, _)| label))
        .collect();

    for label in labels {
        path.push(label.to_string());
        diff_nodes(
            old.and_then(|n| n.child(label)),
            new.and_then(|n| n.child(label)),
            path,
            entries,
        );
        path.pop();
    }
}
