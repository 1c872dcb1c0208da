// ── Full refresh application ──
//
// Applies one refresh cycle's data to the store. Primary collections are
// always replaced; a secondary collection whose fetch failed arrives as
// `None` and keeps its previous contents.

use chrono::Utc;

use super::DataStore;
use super::collection::EntityCollection;
use super::data_store::{
    acl_key, dns_key, enrollment_key_key, ext_client_key, group_key, host_key, network_key,
    node_key, role_key, tag_key, user_key,
};
use crate::model::{
    AclRule, DnsEntry, EnrollmentKey, EntityId, ExtClient, Host, Network, Node, ServerInfo, Tag,
    User, UserGroup, UserRole,
};

/// Everything fetched during a single refresh cycle.
#[derive(Default)]
pub(crate) struct RefreshSnapshot {
    pub networks: Vec<Network>,
    pub hosts: Vec<Host>,
    pub nodes: Vec<Node>,
    pub users: Vec<User>,
    pub ext_clients: Option<Vec<ExtClient>>,
    pub user_groups: Option<Vec<UserGroup>>,
    pub user_roles: Option<Vec<UserRole>>,
    pub acls: Option<Vec<AclRule>>,
    pub tags: Option<Vec<Tag>>,
    pub dns_entries: Option<Vec<DnsEntry>>,
    pub enrollment_keys: Option<Vec<EnrollmentKey>>,
    pub server_info: Option<ServerInfo>,
}

fn replace<T: Send + Sync + 'static>(
    collection: &EntityCollection<T>,
    items: Vec<T>,
    key_of: impl Fn(&T) -> (String, EntityId),
) {
    collection.replace_all(
        items
            .into_iter()
            .map(|item| {
                let (key, id) = key_of(&item);
                (key, id, item)
            })
            .collect(),
    );
}

fn replace_opt<T: Send + Sync + 'static>(
    collection: &EntityCollection<T>,
    items: Option<Vec<T>>,
    key_of: impl Fn(&T) -> (String, EntityId),
) {
    if let Some(items) = items {
        replace(collection, items, key_of);
    }
}

impl DataStore {
    pub(crate) fn apply_snapshot(&self, snap: RefreshSnapshot) {
        replace(&self.networks, snap.networks, |n| {
            (network_key(&n.name), n.id.clone())
        });
        replace(&self.hosts, snap.hosts, |h| (host_key(&h.id), h.id.clone()));
        replace(&self.nodes, snap.nodes, |n| (node_key(&n.id), n.id.clone()));
        replace(&self.users, snap.users, |u| {
            (user_key(&u.username), u.id.clone())
        });

        replace_opt(&self.ext_clients, snap.ext_clients, |c| {
            (ext_client_key(&c.network, &c.name), c.id.clone())
        });
        replace_opt(&self.user_groups, snap.user_groups, |g| {
            (group_key(&g.id), g.id.clone())
        });
        replace_opt(&self.user_roles, snap.user_roles, |r| {
            (role_key(&r.id), r.id.clone())
        });
        replace_opt(&self.acls, snap.acls, |a| (acl_key(&a.id), a.id.clone()));
        replace_opt(&self.tags, snap.tags, |t| (tag_key(&t.id), t.id.clone()));
        replace_opt(&self.dns_entries, snap.dns_entries, |d| {
            (
                dns_key(&d.network, &d.name),
                EntityId::Name(format!("{}/{}", d.network, d.name)),
            )
        });
        replace_opt(&self.enrollment_keys, snap.enrollment_keys, |k| {
            (enrollment_key_key(&k.id), k.id.clone())
        });

        if let Some(info) = snap.server_info {
            self.set_server_info(info);
        }

        self.last_full_refresh.send_replace(Some(Utc::now()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::fixtures::{host, node};

    fn tag(id: &str, network: &str) -> Tag {
        Tag {
            id: EntityId::Name(id.into()),
            name: id.into(),
            network: network.into(),
            tagged_nodes: Vec::new(),
            used_by_count: 0,
            created_by: "admin".into(),
            created_at: None,
        }
    }

    #[test]
    fn snapshot_replaces_primary_collections() {
        let store = DataStore::new();
        store.upsert_node(node("stale", "h1", "office"));

        store.apply_snapshot(RefreshSnapshot {
            hosts: vec![host("h1", "edge", "linux")],
            nodes: vec![node("n1", "h1", "office")],
            ..RefreshSnapshot::default()
        });

        assert_eq!(store.node_count(), 1);
        assert!(store.node_by_id(&EntityId::from("stale")).is_none());
        assert!(store.last_full_refresh().is_some());
    }

    #[test]
    fn failed_secondary_fetch_keeps_previous_data() {
        let store = DataStore::new();
        store.upsert_tag(tag("office.web", "office"));

        store.apply_snapshot(RefreshSnapshot::default());
        assert_eq!(store.tags_snapshot().len(), 1);

        store.apply_snapshot(RefreshSnapshot {
            tags: Some(Vec::new()),
            ..RefreshSnapshot::default()
        });
        assert!(store.tags_snapshot().is_empty());
    }
}
