//! Subtree change notification over successive configuration snapshots
//!
//! A [`Registry`] holds the current [`MerkleTree`] snapshot and a set of
//! listeners keyed by path. Each [`Registry::update`] compares the new
//! snapshot with the previous one once per watched path (not once per tree
//! node) and notifies the listeners of every path whose subtree hash moved.

mod listener;
mod settings;
mod stream;

pub use listener::{ListenerId, TreeChangeListener};
pub use settings::Settings;
pub use stream::SubtreeChanges;

use crate::digest::{Digest, ValueSerializer};
use crate::model::Path;
use crate::ops::{detect_change, Change, SubtreeChange};
use crate::trie::MerkleTree;
use futures::channel::mpsc;
use futures::stream::{Stream, StreamExt};
use listener::ListenerSet;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of one [`Registry::update`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Watched paths whose subtree changed
    pub changed_paths: usize,
    /// Listener invocations that completed
    pub delivered: usize,
    /// Listener invocations that panicked
    pub failed: usize,
}

/// Holds the current configuration snapshot and dispatches subtree changes
///
/// `Registry` is a cheap handle; clones share the same snapshot and
/// listeners. Independent registries never share state.
///
/// Listeners run on the thread calling [`update`](Self::update), after the
/// internal lock is released, so a listener may itself call `listen`,
/// `cancel` or `update`.
pub struct Registry<V> {
    inner: Arc<Inner<V>>,
}

struct Inner<V> {
    settings: Settings,
    next_id: AtomicU64,
    state: Mutex<State<V>>,
}

struct State<V> {
    current: Option<MerkleTree<V>>,
    listeners: BTreeMap<Path, ListenerSet<V>>,
}

impl<V> Inner<V> {
    fn cancel(&self, path: &Path, id: ListenerId) -> bool {
        let (removed, emptied) = {
            let mut state = self.state.lock();
            let Some(set) = state.listeners.get_mut(path) else {
                return false;
            };
            let removed = set.remove(id);
            let emptied = if set.is_empty() {
                state.listeners.remove(path)
            } else {
                None
            };
            (removed, emptied)
        };
        // Dropped outside the lock: a listener may own a stream whose drop
        // cancels another registration.
        drop(emptied);
        removed.is_some()
    }
}

impl<V> Registry<V> {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Registry {
            inner: Arc::new(Inner {
                settings,
                next_id: AtomicU64::new(1),
                state: Mutex::new(State {
                    current: None,
                    listeners: BTreeMap::new(),
                }),
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// An empty tree hashed with the configured algorithm
    pub fn empty_tree(&self, serializer: impl ValueSerializer<V> + 'static) -> MerkleTree<V> {
        MerkleTree::empty(Digest::new(self.inner.settings.digest, serializer))
    }

    /// The snapshot passed to the latest `update`, if any
    pub fn current(&self) -> Option<MerkleTree<V>> {
        self.inner.state.lock().current.clone()
    }

    /// Register `listener` for changes of the subtree at `path`
    ///
    /// Nothing is delivered on registration; the listener hears about the
    /// next `update` that changes its subtree.
    pub fn listen(
        &self,
        path: impl Into<Path>,
        listener: impl TreeChangeListener<V> + 'static,
    ) -> ListenerId {
        let path = path.into();
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .state
            .lock()
            .listeners
            .entry(path)
            .or_insert_with(ListenerSet::new)
            .add(id, Arc::new(listener));
        id
    }

    /// Unregister a listener; returns whether it was registered
    pub fn cancel(&self, path: impl Into<Path>, id: ListenerId) -> bool {
        self.inner.cancel(&path.into(), id)
    }

    pub fn listener_count(&self, path: impl Into<Path>) -> usize {
        self.inner
            .state
            .lock()
            .listeners
            .get(&path.into())
            .map_or(0, |set| set.len())
    }

    /// Swap in `tree` as the current snapshot and notify changed paths
    ///
    /// Detection runs under the lock against the snapshot being replaced;
    /// listeners are invoked after the lock is released. A panicking
    /// listener is logged and does not stop delivery to the others.
    pub fn update(&self, tree: MerkleTree<V>) -> UpdateSummary {
        let (pending, previous) = {
            let mut state = self.inner.state.lock();
            let previous = state.current.replace(tree.clone());

            let mut pending = Vec::new();
            for (path, listeners) in &state.listeners {
                if listeners.is_empty() {
                    continue;
                }
                if let Change::Changed(change) =
                    detect_change(previous.as_ref(), &tree, path.segments())
                {
                    pending.push((path.clone(), change, listeners.clone()));
                }
            }
            (pending, previous)
        };
        drop(previous);

        let name = self.inner.settings.name.as_str();
        debug!(
            registry = name,
            root = %tree.hash().short(),
            changed = pending.len(),
            "applied configuration snapshot"
        );

        let mut summary = UpdateSummary {
            changed_paths: pending.len(),
            ..Default::default()
        };
        for (path, change, listeners) in &pending {
            trace!(
                registry = name,
                path = %path,
                present = change.is_present(),
                "subtree changed"
            );
            let (delivered, failed) = listeners.notify(name, path, change);
            summary.delivered += delivered;
            summary.failed += failed;
        }
        summary
    }

    /// Apply every snapshot produced by `updates`, in order
    ///
    /// Returns the number of snapshots applied once the stream ends.
    pub async fn follow<S>(&self, updates: S) -> usize
    where
        S: Stream<Item = MerkleTree<V>>,
    {
        futures::pin_mut!(updates);
        let mut applied = 0;
        while let Some(tree) = updates.next().await {
            self.update(tree);
            applied += 1;
        }
        applied
    }
}

impl<V: Send + Sync + 'static> Registry<V> {
    /// Changes of the subtree at `path` as a stream
    ///
    /// Equivalent to [`listen`](Self::listen) with a listener feeding the
    /// stream. Dropping the stream cancels that listener.
    pub fn subtree_changes(&self, path: impl Into<Path>) -> SubtreeChanges<V> {
        let path = path.into();
        let (sender, receiver) = mpsc::unbounded();
        let id = self.listen(path.clone(), move |change: &SubtreeChange<V>| {
            // Fails only once the receiving side has been dropped.
            let _ = sender.unbounded_send(change.clone());
        });
        SubtreeChanges::new(Arc::downgrade(&self.inner), path, id, receiver)
    }
}

impl<V> Clone for Registry<V> {
    fn clone(&self) -> Self {
        Registry {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Registry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Registry")
            .field("name", &self.inner.settings.name)
            .field("current", &state.current.as_ref().map(|tree| tree.hash()))
            .field("watched_paths", &state.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    fn s(v: &str) -> String {
        v.to_string()
    }

    fn recorder(registry: &Registry<String>, path: &[&str]) -> Arc<PlMutex<Vec<Option<String>>>> {
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.listen(Path::new(path), move |change: &SubtreeChange<String>| {
            sink.lock().push(change.value().cloned());
        });
        seen
    }

    #[test]
    fn test_listen_each_change() {
        let registry = Registry::new();
        let seen = recorder(&registry, &["some-key"]);

        let c1 = MerkleTree::empty_bytes().add(s("1"), &["some-key"]).unwrap();
        let c2 = c1.add(s("2"), &["some-key"]).unwrap();
        let c3 = c2.add(s("3"), &["some-key"]).unwrap();

        registry.update(c1);
        registry.update(c2);
        registry.update(c3);

        assert_eq!(
            *seen.lock(),
            vec![Some(s("1")), Some(s("2")), Some(s("3"))]
        );
    }

    #[test]
    fn test_no_callback_on_registration() {
        let registry = Registry::new();
        registry.update(MerkleTree::empty_bytes().add(s("1"), &["k"]).unwrap());

        let seen = recorder(&registry, &["k"]);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let registry: Registry<String> = Registry::new();
        let seen = Arc::new(PlMutex::new(0usize));
        let sink = Arc::clone(&seen);
        let id = registry.listen(["k"], move |_: &SubtreeChange<String>| {
            *sink.lock() += 1;
        });

        let t1 = MerkleTree::empty_bytes().add(s("1"), &["k"]).unwrap();
        registry.update(t1.clone());
        assert!(registry.cancel(["k"], id));
        assert!(!registry.cancel(["k"], id));
        registry.update(t1.add(s("2"), &["k"]).unwrap());

        assert_eq!(*seen.lock(), 1);
        assert_eq!(registry.listener_count(["k"]), 0);
    }

    #[test]
    fn test_listener_may_reenter_registry() {
        let registry: Registry<String> = Registry::new();
        let handle = registry.clone();
        registry.listen(["k"], move |_: &SubtreeChange<String>| {
            handle.listen(["other"], |_: &SubtreeChange<String>| {});
            let _ = handle.current();
        });

        registry.update(MerkleTree::empty_bytes().add(s("1"), &["k"]).unwrap());
        assert_eq!(registry.listener_count(["other"]), 1);
    }

    #[test]
    fn test_cancel_listener_owning_stream() {
        let registry: Registry<String> = Registry::new();
        let changes = registry.subtree_changes(["other"]);
        let id = registry.listen(["k"], move |_: &SubtreeChange<String>| {
            let _ = changes.path();
        });
        assert_eq!(registry.listener_count(["other"]), 1);

        let handle = registry.clone();
        let worker = std::thread::spawn(move || handle.cancel(["k"], id));
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !worker.is_finished() {
            assert!(
                std::time::Instant::now() < deadline,
                "cancel did not return"
            );
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert!(worker.join().unwrap());
        assert_eq!(registry.listener_count(["k"]), 0);
        assert_eq!(registry.listener_count(["other"]), 0);
    }

    #[test]
    fn test_cancel_one_of_several_listeners_owning_streams() {
        let registry: Registry<String> = Registry::new();
        let changes = registry.subtree_changes(["other"]);
        registry.listen(["k"], |_: &SubtreeChange<String>| {});
        let id = registry.listen(["k"], move |_: &SubtreeChange<String>| {
            let _ = changes.id();
        });

        assert!(registry.cancel(["k"], id));
        assert_eq!(registry.listener_count(["k"]), 1);
        assert_eq!(registry.listener_count(["other"]), 0);
    }

    #[test]
    fn test_update_summary() {
        let registry: Registry<String> = Registry::new();
        registry.listen(["a"], |_: &SubtreeChange<String>| {});
        registry.listen(["a"], |_: &SubtreeChange<String>| panic!("listener failure"));
        registry.listen(["b"], |_: &SubtreeChange<String>| {});

        let tree = MerkleTree::empty_bytes().add(s("1"), &["a"]).unwrap();
        let summary = registry.update(tree);

        assert_eq!(
            summary,
            UpdateSummary {
                changed_paths: 1,
                delivered: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn test_independent_registries() {
        let first: Registry<String> = Registry::new();
        let second: Registry<String> = Registry::new();
        first.update(MerkleTree::empty_bytes().add(s("1"), &["a"]).unwrap());

        assert!(first.current().is_some());
        assert!(second.current().is_none());
    }

    #[test]
    fn test_empty_tree_uses_configured_digest() {
        let registry: Registry<String> = Registry::with_settings(
            Settings::new("collector").with_digest(crate::digest::DigestAlgorithm::Sha256),
        );
        let tree = registry.empty_tree(crate::digest::BytesSerializer);
        assert_eq!(
            tree.digest().algorithm(),
            crate::digest::DigestAlgorithm::Sha256
        );
    }
}
