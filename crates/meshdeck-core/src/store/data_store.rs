// ── Central reactive data store ──
//
// Session cache for every controller entity. Refreshes replace whole
// collections; commands apply the entity each mutation returns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::model::{
    AclRule, DnsEntry, EnrollmentKey, EntityId, ExtClient, ExtendedNode, Host, Network, Node,
    ServerInfo, Tag, User, UserGroup, UserRole,
};
use crate::stream::EntityStream;

// ── Keys ─────────────────────────────────────────────────────────────

pub(crate) fn network_key(netid: &str) -> String {
    format!("net:{netid}")
}

pub(crate) fn host_key(id: &EntityId) -> String {
    format!("host:{id}")
}

pub(crate) fn node_key(id: &EntityId) -> String {
    format!("node:{id}")
}

pub(crate) fn ext_client_key(network: &str, client_id: &str) -> String {
    format!("ext:{network}/{client_id}")
}

pub(crate) fn user_key(username: &str) -> String {
    format!("user:{username}")
}

pub(crate) fn group_key(id: &EntityId) -> String {
    format!("grp:{id}")
}

pub(crate) fn role_key(id: &EntityId) -> String {
    format!("role:{id}")
}

pub(crate) fn acl_key(id: &EntityId) -> String {
    format!("acl:{id}")
}

pub(crate) fn tag_key(id: &EntityId) -> String {
    format!("tag:{id}")
}

pub(crate) fn dns_key(network: &str, name: &str) -> String {
    format!("dns:{network}/{name}")
}

pub(crate) fn enrollment_key_key(id: &EntityId) -> String {
    format!("key:{id}")
}

/// Every entity the controller knows about, held for one session.
///
/// Constructible standalone so tests and alternative front ends can feed
/// it directly. Reads are cheap `Arc` clones of the current snapshot.
pub struct DataStore {
    pub(crate) networks: EntityCollection<Network>,
    pub(crate) hosts: EntityCollection<Host>,
    pub(crate) nodes: EntityCollection<Node>,
    pub(crate) ext_clients: EntityCollection<ExtClient>,
    pub(crate) users: EntityCollection<User>,
    pub(crate) user_groups: EntityCollection<UserGroup>,
    pub(crate) user_roles: EntityCollection<UserRole>,
    pub(crate) acls: EntityCollection<AclRule>,
    pub(crate) tags: EntityCollection<Tag>,
    pub(crate) dns_entries: EntityCollection<DnsEntry>,
    pub(crate) enrollment_keys: EntityCollection<EnrollmentKey>,
    pub(crate) server_info: watch::Sender<Option<Arc<ServerInfo>>>,
    pub(crate) last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (server_info, _) = watch::channel(None);
        let (last_full_refresh, _) = watch::channel(None);

        Self {
            networks: EntityCollection::new(),
            hosts: EntityCollection::new(),
            nodes: EntityCollection::new(),
            ext_clients: EntityCollection::new(),
            users: EntityCollection::new(),
            user_groups: EntityCollection::new(),
            user_roles: EntityCollection::new(),
            acls: EntityCollection::new(),
            tags: EntityCollection::new(),
            dns_entries: EntityCollection::new(),
            enrollment_keys: EntityCollection::new(),
            server_info,
            last_full_refresh,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn networks_snapshot(&self) -> Arc<Vec<Arc<Network>>> {
        self.networks.snapshot()
    }

    pub fn hosts_snapshot(&self) -> Arc<Vec<Arc<Host>>> {
        self.hosts.snapshot()
    }

    pub fn nodes_snapshot(&self) -> Arc<Vec<Arc<Node>>> {
        self.nodes.snapshot()
    }

    pub fn ext_clients_snapshot(&self) -> Arc<Vec<Arc<ExtClient>>> {
        self.ext_clients.snapshot()
    }

    pub fn users_snapshot(&self) -> Arc<Vec<Arc<User>>> {
        self.users.snapshot()
    }

    pub fn user_groups_snapshot(&self) -> Arc<Vec<Arc<UserGroup>>> {
        self.user_groups.snapshot()
    }

    pub fn user_roles_snapshot(&self) -> Arc<Vec<Arc<UserRole>>> {
        self.user_roles.snapshot()
    }

    pub fn acls_snapshot(&self) -> Arc<Vec<Arc<AclRule>>> {
        self.acls.snapshot()
    }

    pub fn tags_snapshot(&self) -> Arc<Vec<Arc<Tag>>> {
        self.tags.snapshot()
    }

    pub fn dns_entries_snapshot(&self) -> Arc<Vec<Arc<DnsEntry>>> {
        self.dns_entries.snapshot()
    }

    pub fn enrollment_keys_snapshot(&self) -> Arc<Vec<Arc<EnrollmentKey>>> {
        self.enrollment_keys.snapshot()
    }

    pub fn server_info(&self) -> Option<Arc<ServerInfo>> {
        self.server_info.borrow().clone()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn network(&self, netid: &str) -> Option<Arc<Network>> {
        self.networks.get_by_key(&network_key(netid))
    }

    pub fn host_by_id(&self, id: &EntityId) -> Option<Arc<Host>> {
        self.hosts.get_by_key(&host_key(id))
    }

    pub fn node_by_id(&self, id: &EntityId) -> Option<Arc<Node>> {
        self.nodes.get_by_key(&node_key(id))
    }

    pub fn user(&self, username: &str) -> Option<Arc<User>> {
        self.users.get_by_key(&user_key(username))
    }

    pub fn ext_client(&self, network: &str, client_id: &str) -> Option<Arc<ExtClient>> {
        self.ext_clients
            .get_by_key(&ext_client_key(network, client_id))
    }

    pub fn acl_by_id(&self, id: &EntityId) -> Option<Arc<AclRule>> {
        self.acls.get_by_id(id)
    }

    pub fn tag_by_id(&self, id: &EntityId) -> Option<Arc<Tag>> {
        self.tags.get_by_id(id)
    }

    pub fn user_group_by_id(&self, id: &EntityId) -> Option<Arc<UserGroup>> {
        self.user_groups.get_by_id(id)
    }

    pub fn enrollment_key_by_id(&self, id: &EntityId) -> Option<Arc<EnrollmentKey>> {
        self.enrollment_keys.get_by_id(id)
    }

    /// Look a host up by id, then by exact name.
    pub fn resolve_host(&self, name_or_id: &str) -> Option<Arc<Host>> {
        self.host_by_id(&EntityId::from(name_or_id))
            .or_else(|| self.hosts.find(|h| h.name == name_or_id))
    }

    /// Look a node up by id, or by its host's name within `network`.
    pub fn resolve_node(&self, network: &str, name_or_id: &str) -> Option<ExtendedNode> {
        if let Some(node) = self.node_by_id(&EntityId::from(name_or_id)) {
            if node.network == network {
                return Some(self.extend(node));
            }
        }
        self.nodes_in_network(network)
            .into_iter()
            .find(|n| n.host.as_ref().is_some_and(|h| h.name == name_or_id))
    }

    // ── Derived views ────────────────────────────────────────────────

    fn extend(&self, node: Arc<Node>) -> ExtendedNode {
        let host = self.host_by_id(&node.host_id);
        ExtendedNode { node, host }
    }

    /// Every node merged with its host.
    pub fn extended_nodes(&self) -> Vec<ExtendedNode> {
        self.nodes
            .snapshot()
            .iter()
            .map(|n| self.extend(Arc::clone(n)))
            .collect()
    }

    pub fn extended_node(&self, id: &EntityId) -> Option<ExtendedNode> {
        self.node_by_id(id).map(|n| self.extend(n))
    }

    pub fn nodes_in_network(&self, network: &str) -> Vec<ExtendedNode> {
        self.nodes
            .snapshot()
            .iter()
            .filter(|n| n.network == network)
            .map(|n| self.extend(Arc::clone(n)))
            .collect()
    }

    /// The node `host_id` has in `network`, if it has joined it.
    pub fn node_for_host(&self, network: &str, host_id: &EntityId) -> Option<Arc<Node>> {
        self.nodes
            .find(|n| n.network == network && &n.host_id == host_id)
    }

    pub fn ext_clients_in_network(&self, network: &str) -> Vec<Arc<ExtClient>> {
        filter_network(&self.ext_clients.snapshot(), |c| c.network == network)
    }

    pub fn acls_in_network(&self, network: &str) -> Vec<Arc<AclRule>> {
        filter_network(&self.acls.snapshot(), |a| a.network == network)
    }

    pub fn tags_in_network(&self, network: &str) -> Vec<Arc<Tag>> {
        filter_network(&self.tags.snapshot(), |t| t.network == network)
    }

    pub fn dns_in_network(&self, network: &str) -> Vec<Arc<DnsEntry>> {
        filter_network(&self.dns_entries.snapshot(), |d| d.network == network)
    }

    // ── Counts ───────────────────────────────────────────────────────

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ── Actions ──────────────────────────────────────────────────────

    pub fn upsert_network(&self, network: Network) {
        self.networks
            .upsert(network_key(&network.name), network.id.clone(), network);
    }

    /// Drop a network and everything scoped to it.
    pub fn remove_network(&self, netid: &str) {
        self.networks.remove(&network_key(netid));
        self.nodes.remove_where(|n| n.network == netid);
        self.ext_clients.remove_where(|c| c.network == netid);
        self.acls.remove_where(|a| a.network == netid);
        self.tags.remove_where(|t| t.network == netid);
        self.dns_entries.remove_where(|d| d.network == netid);
    }

    pub fn upsert_host(&self, host: Host) {
        self.hosts.upsert(host_key(&host.id), host.id.clone(), host);
    }

    /// Drop a host and its nodes.
    pub fn remove_host(&self, id: &EntityId) {
        self.hosts.remove(&host_key(id));
        self.nodes.remove_where(|n| &n.host_id == id);
    }

    pub fn upsert_node(&self, node: Node) {
        self.nodes.upsert(node_key(&node.id), node.id.clone(), node);
    }

    pub fn upsert_nodes(&self, nodes: impl IntoIterator<Item = Node>) {
        for node in nodes {
            self.upsert_node(node);
        }
    }

    pub fn remove_node(&self, id: &EntityId) {
        self.nodes.remove(&node_key(id));
    }

    pub fn upsert_ext_client(&self, client: ExtClient) {
        self.ext_clients.upsert(
            ext_client_key(&client.network, &client.name),
            client.id.clone(),
            client,
        );
    }

    pub fn remove_ext_client(&self, network: &str, client_id: &str) {
        self.ext_clients
            .remove(&ext_client_key(network, client_id));
    }

    pub fn upsert_user(&self, user: User) {
        self.users
            .upsert(user_key(&user.username), user.id.clone(), user);
    }

    pub fn remove_user(&self, username: &str) {
        self.users.remove(&user_key(username));
    }

    pub fn upsert_user_group(&self, group: UserGroup) {
        self.user_groups
            .upsert(group_key(&group.id), group.id.clone(), group);
    }

    pub fn remove_user_group(&self, id: &EntityId) {
        self.user_groups.remove(&group_key(id));
    }

    pub fn upsert_acl(&self, acl: AclRule) {
        self.acls.upsert(acl_key(&acl.id), acl.id.clone(), acl);
    }

    pub fn remove_acl(&self, id: &EntityId) {
        self.acls.remove(&acl_key(id));
    }

    pub fn upsert_tag(&self, tag: Tag) {
        self.tags.upsert(tag_key(&tag.id), tag.id.clone(), tag);
    }

    pub fn remove_tag(&self, id: &EntityId) {
        self.tags.remove(&tag_key(id));
    }

    pub fn upsert_dns_entry(&self, entry: DnsEntry) {
        let key = dns_key(&entry.network, &entry.name);
        let id = EntityId::Name(format!("{}/{}", entry.network, entry.name));
        self.dns_entries.upsert(key, id, entry);
    }

    pub fn remove_dns_entry(&self, network: &str, name: &str) {
        self.dns_entries.remove(&dns_key(network, name));
    }

    pub fn upsert_enrollment_key(&self, key: EnrollmentKey) {
        self.enrollment_keys
            .upsert(enrollment_key_key(&key.id), key.id.clone(), key);
    }

    pub fn remove_enrollment_key(&self, id: &EntityId) {
        self.enrollment_keys.remove(&enrollment_key_key(id));
    }

    pub fn set_server_info(&self, info: ServerInfo) {
        self.server_info.send_replace(Some(Arc::new(info)));
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_networks(&self) -> EntityStream<Network> {
        EntityStream::new(self.networks.subscribe())
    }

    pub fn subscribe_hosts(&self) -> EntityStream<Host> {
        EntityStream::new(self.hosts.subscribe())
    }

    pub fn subscribe_nodes(&self) -> EntityStream<Node> {
        EntityStream::new(self.nodes.subscribe())
    }

    pub fn subscribe_ext_clients(&self) -> EntityStream<ExtClient> {
        EntityStream::new(self.ext_clients.subscribe())
    }

    pub fn subscribe_users(&self) -> EntityStream<User> {
        EntityStream::new(self.users.subscribe())
    }

    pub fn subscribe_acls(&self) -> EntityStream<AclRule> {
        EntityStream::new(self.acls.subscribe())
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    /// How long ago the last full refresh happened.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_full_refresh().map(|t| Utc::now() - t)
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

fn filter_network<T>(snapshot: &[Arc<T>], pred: impl Fn(&T) -> bool) -> Vec<Arc<T>> {
    snapshot.iter().filter(|e| pred(e)).cloned().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::model::NodeStatus;
    use pretty_assertions::assert_eq;

    pub(crate) fn host(id: &str, name: &str, os: &str) -> Host {
        Host {
            id: EntityId::from(id),
            name: name.into(),
            version: "v0.24.0".into(),
            os: os.into(),
            endpoint_ip: Some("203.0.113.10".parse().unwrap()),
            endpoint_ipv6: None,
            listen_port: 51821,
            public_key: String::new(),
            mtu: 1420,
            persistent_keepalive: 20,
            nat_type: None,
            is_default: false,
            is_static: false,
            node_ids: Vec::new(),
            mac: None,
        }
    }

    pub(crate) fn node(id: &str, host_id: &str, network: &str) -> Node {
        Node {
            id: EntityId::from(id),
            host_id: EntityId::from(host_id),
            network: network.into(),
            address: None,
            address6: None,
            connected: true,
            status: NodeStatus::Online,
            last_check_in: None,
            is_relay: false,
            relayed_nodes: Vec::new(),
            is_relayed: false,
            relayed_by: None,
            is_egress_gateway: false,
            egress_ranges: Vec::new(),
            egress_nat: false,
            is_ingress_gateway: false,
            ingress_dns: None,
            is_internet_gateway: false,
            internet_gateway_clients: Vec::new(),
            internet_gateway_id: None,
            tags: Vec::new(),
            pending_delete: false,
            expires_at: None,
        }
    }

    fn seeded() -> DataStore {
        let store = DataStore::new();
        store.upsert_host(host("h-edge", "edge", "linux"));
        store.upsert_host(host("h-laptop", "laptop", "darwin"));
        store.upsert_node(node("n1", "h-edge", "office"));
        store.upsert_node(node("n2", "h-laptop", "office"));
        store.upsert_node(node("n3", "h-edge", "lab"));
        store
    }

    #[test]
    fn extended_node_merges_host_fields() {
        let store = seeded();
        let ext = store.extended_node(&EntityId::from("n1")).unwrap();
        assert_eq!(ext.name(), "edge");
        assert!(ext.is_linux());
        assert_eq!(ext.endpoint(), "203.0.113.10:51821");
    }

    #[test]
    fn extended_node_without_host_uses_node_id() {
        let store = DataStore::new();
        store.upsert_node(node("orphan", "missing", "office"));
        let ext = store.extended_node(&EntityId::from("orphan")).unwrap();
        assert_eq!(ext.name(), "orphan");
        assert_eq!(ext.endpoint(), "");
    }

    #[test]
    fn resolve_node_by_host_name_is_network_scoped() {
        let store = seeded();
        let office = store.resolve_node("office", "edge").unwrap();
        assert_eq!(office.node.id, EntityId::from("n1"));
        let lab = store.resolve_node("lab", "edge").unwrap();
        assert_eq!(lab.node.id, EntityId::from("n3"));
        assert!(store.resolve_node("lab", "laptop").is_none());
    }

    #[test]
    fn resolve_node_by_id_checks_network() {
        let store = seeded();
        assert!(store.resolve_node("office", "n1").is_some());
        assert!(store.resolve_node("lab", "n1").is_none());
    }

    #[test]
    fn resolve_host_by_name_or_id() {
        let store = seeded();
        assert_eq!(store.resolve_host("edge").unwrap().id, EntityId::from("h-edge"));
        assert_eq!(store.resolve_host("h-laptop").unwrap().name, "laptop");
        assert!(store.resolve_host("nope").is_none());
    }

    #[test]
    fn remove_host_drops_its_nodes() {
        let store = seeded();
        store.remove_host(&EntityId::from("h-edge"));
        assert_eq!(store.host_count(), 1);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn remove_network_drops_scoped_entities() {
        let store = seeded();
        store.upsert_dns_entry(DnsEntry {
            name: "nas".into(),
            network: "office".into(),
            address: Some("10.101.0.9".parse().unwrap()),
            address6: None,
        });
        store.remove_network("office");
        assert_eq!(store.node_count(), 1);
        assert!(store.dns_in_network("office").is_empty());
    }

    #[test]
    fn node_for_host_finds_membership() {
        let store = seeded();
        let n = store
            .node_for_host("lab", &EntityId::from("h-edge"))
            .unwrap();
        assert_eq!(n.id, EntityId::from("n3"));
        assert!(store
            .node_for_host("lab", &EntityId::from("h-laptop"))
            .is_none());
    }

    #[tokio::test]
    async fn subscription_sees_upserts() {
        let store = DataStore::new();
        let mut nodes = store.subscribe_nodes();
        assert!(nodes.current().is_empty());

        store.upsert_node(node("n1", "h1", "office"));
        let snap = nodes.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
    }
}
