//! Stream view of subtree changes

use super::{Inner, ListenerId};
use crate::model::Path;
use crate::ops::SubtreeChange;
use futures::channel::mpsc::UnboundedReceiver;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use tracing::trace;

/// Changes of one watched subtree, as a [`Stream`]
///
/// Created by [`Registry::subtree_changes`](super::Registry::subtree_changes).
/// Each item corresponds to one update in which the subtree changed.
/// Dropping the stream (or calling [`cancel`](Self::cancel)) unregisters
/// its listener. The stream ends once the registry itself is dropped.
pub struct SubtreeChanges<V> {
    registry: Option<Weak<Inner<V>>>,
    path: Path,
    id: ListenerId,
    receiver: UnboundedReceiver<SubtreeChange<V>>,
}

impl<V> SubtreeChanges<V> {
    pub(super) fn new(
        registry: Weak<Inner<V>>,
        path: Path,
        id: ListenerId,
        receiver: UnboundedReceiver<SubtreeChange<V>>,
    ) -> Self {
        SubtreeChanges {
            registry: Some(registry),
            path,
            id,
            receiver,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Stop receiving changes
    pub fn cancel(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        let Some(registry) = self.registry.take() else {
            return;
        };
        if let Some(inner) = registry.upgrade() {
            inner.cancel(&self.path, self.id);
            trace!(
                registry = %inner.settings.name,
                path = %self.path,
                listener = %self.id,
                "stream subscriber detached"
            );
        }
        self.receiver.close();
    }
}

impl<V> Stream for SubtreeChanges<V> {
    type Item = SubtreeChange<V>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_next_unpin(cx)
    }
}

impl<V> Drop for SubtreeChanges<V> {
    fn drop(&mut self) {
        self.detach();
    }
}
