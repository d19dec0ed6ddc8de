//! Listener trait and per-path fan-out groups

use crate::model::Path;
use crate::ops::SubtreeChange;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Receives the new state of a watched subtree
///
/// Called once per snapshot in which the watched subtree changed, with
/// [`SubtreeChange::Absent`] when the branch was removed. Closures taking
/// `&SubtreeChange<V>` implement this trait.
pub trait TreeChangeListener<V>: Send + Sync {
    fn on_change(&self, change: &SubtreeChange<V>);
}

impl<V, F> TreeChangeListener<V> for F
where
    F: Fn(&SubtreeChange<V>) + Send + Sync,
{
    fn on_change(&self, change: &SubtreeChange<V>) {
        self(change)
    }
}

/// Handle identifying one registration, used to cancel it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// All listeners registered under one path
pub(crate) struct ListenerSet<V> {
    listeners: Vec<(ListenerId, Arc<dyn TreeChangeListener<V>>)>,
}

impl<V> ListenerSet<V> {
    pub(crate) fn new() -> Self {
        ListenerSet {
            listeners: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, id: ListenerId, listener: Arc<dyn TreeChangeListener<V>>) {
        self.listeners.push((id, listener));
    }

    /// Take the listener registered as `id` out of the set
    ///
    /// The caller decides where the listener is dropped; dropping it may run
    /// arbitrary code that re-enters the registry.
    pub(crate) fn remove(&mut self, id: ListenerId) -> Option<Arc<dyn TreeChangeListener<V>>> {
        let index = self
            .listeners
            .iter()
            .position(|(existing, _)| *existing == id)?;
        Some(self.listeners.remove(index).1)
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `change` to every listener
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// Returns `(delivered, failed)`.
    pub(crate) fn notify(
        &self,
        registry: &str,
        path: &Path,
        change: &SubtreeChange<V>,
    ) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;
        for (id, listener) in &self.listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_change(change))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    failed += 1;
                    error!(
                        registry,
                        path = %path,
                        listener = %id,
                        "listener panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        (delivered, failed)
    }
}

impl<V> Clone for ListenerSet<V> {
    fn clone(&self) -> Self {
        ListenerSet {
            listeners: self.listeners.clone(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "<non-string panic payload>"
    }
}
