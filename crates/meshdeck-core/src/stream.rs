// ── Reactive entity streams ──
//
// Subscription handles over a store collection.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to one collection of entities.
///
/// Holds the snapshot seen at creation time and yields a fresh snapshot
/// on every mutation, either through [`changed`](Self::changed) or as a
/// `Stream`.
pub struct EntityStream<T: Send + Sync + 'static> {
    current: Arc<Vec<Arc<T>>>,
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    pub fn current(&self) -> &Arc<Vec<Arc<T>>> {
        &self.current
    }

    pub fn latest(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a snapshot per mutation.
pub struct EntityWatchStream<T: Send + Sync + 'static> {
    inner: WatchStream<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> Stream for EntityWatchStream<T> {
    type Item = Arc<Vec<Arc<T>>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use crate::model::EntityId;
    use crate::store::DataStore;
    use crate::store::fixtures::host;

    #[tokio::test]
    async fn stream_yields_current_then_updates() {
        let store = DataStore::new();
        store.upsert_host(host("h1", "edge", "linux"));

        let mut stream = store.subscribe_hosts().into_stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first.len(), 1);

        store.upsert_host(host("h2", "relay", "linux"));
        let second = stream.next().await.unwrap();
        assert_eq!(second.len(), 2);

        store.remove_host(&EntityId::from("h1"));
        let third = stream.next().await.unwrap();
        assert_eq!(third.len(), 1);
    }
}
