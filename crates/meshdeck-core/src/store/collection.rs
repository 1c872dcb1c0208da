// ── Generic reactive entity collection ──
//
// Concurrent keyed storage with an id index and a `watch`-published
// snapshot, rebuilt in key order on every mutation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::EntityId;

/// Storage for a single entity type.
///
/// Keys are synthetic prefixed strings (`"node:{id}"`, `"ext:{net}/{id}"`).
/// Snapshots are sorted by key so listings are stable between refreshes.
pub(crate) struct EntityCollection<T: Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
    id_to_key: DashMap<EntityId, String>,
    key_to_id: DashMap<String, EntityId>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            id_to_key: DashMap::new(),
            key_to_id: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace an entity. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: String, id: EntityId, entity: T) -> bool {
        let is_new = self.insert_quiet(key, id, entity);
        self.publish();
        is_new
    }

    /// Replace the whole collection: upsert every item, then drop keys
    /// that were not in the batch. Subscribers see one update, never an
    /// empty intermediate state.
    pub(crate) fn replace_all(&self, items: Vec<(String, EntityId, T)>) {
        let mut incoming = std::collections::HashSet::with_capacity(items.len());
        for (key, id, entity) in items {
            incoming.insert(key.clone());
            self.insert_quiet(key, id, entity);
        }
        let stale: Vec<String> = self
            .by_key
            .iter()
            .filter(|r| !incoming.contains(r.key()))
            .map(|r| r.key().clone())
            .collect();
        for key in stale {
            self.remove_quiet(&key);
        }
        self.publish();
    }

    /// Remove an entity by key.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.remove_quiet(key);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Remove every entity matching `pred`. Returns how many went.
    pub(crate) fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let doomed: Vec<String> = self
            .by_key
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.key().clone())
            .collect();
        for key in &doomed {
            self.remove_quiet(key);
        }
        if !doomed.is_empty() {
            self.publish();
        }
        doomed.len()
    }

    pub(crate) fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn get_by_id(&self, id: &EntityId) -> Option<Arc<T>> {
        let key = self.id_to_key.get(id)?;
        self.by_key
            .get(key.value().as_str())
            .map(|r| Arc::clone(r.value()))
    }

    /// First entity matching `pred`, in key order.
    pub(crate) fn find(&self, pred: impl Fn(&T) -> bool) -> Option<Arc<T>> {
        self.snapshot().iter().find(|e| pred(e)).cloned()
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn insert_quiet(&self, key: String, id: EntityId, entity: T) -> bool {
        if let Some(old_id) = self.key_to_id.get(&key).map(|r| r.value().clone()) {
            if old_id != id {
                self.id_to_key.remove(&old_id);
            }
        }
        let is_new = self.by_key.insert(key.clone(), Arc::new(entity)).is_none();
        self.id_to_key.insert(id.clone(), key.clone());
        self.key_to_id.insert(key, id);
        is_new
    }

    fn remove_quiet(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v)?;
        if let Some((_, id)) = self.key_to_id.remove(key) {
            self.id_to_key.remove(&id);
        }
        Some(removed)
    }

    fn publish(&self) {
        let mut entries: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let values = entries.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_new_keys() {
        let col: EntityCollection<String> = EntityCollection::new();
        assert!(col.upsert("k".into(), EntityId::from("a"), "one".into()));
        assert!(!col.upsert("k".into(), EntityId::from("a"), "two".into()));
        assert_eq!(*col.get_by_key("k").unwrap(), "two");
    }

    #[test]
    fn lookup_by_id() {
        let col: EntityCollection<String> = EntityCollection::new();
        let id = EntityId::from("2b5c7e1a-54d1-4c3e-a8f0-2f9a1c8d3e01");
        col.upsert("node:x".into(), id.clone(), "relay".into());
        assert_eq!(*col.get_by_id(&id).unwrap(), "relay");
    }

    #[test]
    fn snapshot_is_key_ordered() {
        let col: EntityCollection<&'static str> = EntityCollection::new();
        col.upsert("net:b".into(), EntityId::from("b"), "b");
        col.upsert("net:a".into(), EntityId::from("a"), "a");
        col.upsert("net:c".into(), EntityId::from("c"), "c");
        let snap: Vec<&str> = col.snapshot().iter().map(|s| **s).collect();
        assert_eq!(snap, vec!["a", "b", "c"]);
    }

    #[test]
    fn replace_all_prunes_missing_keys() {
        let col: EntityCollection<u32> = EntityCollection::new();
        col.upsert("a".into(), EntityId::from("a"), 1);
        col.upsert("b".into(), EntityId::from("b"), 2);

        col.replace_all(vec![
            ("b".into(), EntityId::from("b"), 20),
            ("c".into(), EntityId::from("c"), 30),
        ]);

        assert!(col.get_by_key("a").is_none());
        assert!(col.get_by_id(&EntityId::from("a")).is_none());
        assert_eq!(*col.get_by_key("b").unwrap(), 20);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn replace_all_publishes_once() {
        let col: EntityCollection<u32> = EntityCollection::new();
        let mut rx = col.subscribe();
        rx.borrow_and_update();

        col.replace_all(vec![
            ("a".into(), EntityId::from("a"), 1),
            ("b".into(), EntityId::from("b"), 2),
        ]);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn remove_where_drops_matching() {
        let col: EntityCollection<u32> = EntityCollection::new();
        for n in 0..5u32 {
            col.upsert(format!("k{n}"), EntityId::from(format!("i{n}")), n);
        }
        assert_eq!(col.remove_where(|n| n % 2 == 0), 3);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn rekeyed_id_cleans_old_mapping() {
        let col: EntityCollection<&'static str> = EntityCollection::new();
        col.upsert("k".into(), EntityId::from("old"), "v1");
        col.upsert("k".into(), EntityId::from("new"), "v2");
        assert!(col.get_by_id(&EntityId::from("old")).is_none());
        assert_eq!(*col.get_by_id(&EntityId::from("new")).unwrap(), "v2");
    }
}
