// ── Controller abstraction ──
//
// Connection lifecycle for one overlay-network controller: authentication,
// the initial load, optional background refresh, command routing and
// store access for consumers.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use indexmap::IndexSet;
use ipnet::IpNet;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use meshdeck_api::RestClient;
use meshdeck_api::types::{
    AclResponse, CreateRelayRequest, CreateTagRequest as WireCreateTag,
    CreateUserGroupRequest as WireCreateGroup, DnsEntryResponse, EgressGatewayRequest,
    EnrollmentKeyRequest, ExtClientRequest, ExtClientResponse, HostResponse, InetNodeRequest,
    IngressGatewayRequest, NetworkResponse, NodeResponse, TaggedNodeRef,
    UpdateTagRequest as WireUpdateTag, UserGroupResponse, UserRequest, UserResponse, yes_no,
};

use crate::command::requests::{self, NodeTarget};
use crate::command::{Command, CommandResult};
use crate::config::{AuthCredentials, ControllerConfig};
use crate::convert::acl_member_to_wire;
use crate::error::CoreError;
use crate::model::{
    AclRule, DefaultAclPolicy, DnsEntry, EnrollmentKey, EnrollmentKeyType, EntityId, ExtClient,
    ExtendedNode, Host, Network, Node, PlatformRole, ServerInfo, Tag, User, UserGroup, UserRole,
};
use crate::store::{DataStore, RefreshSnapshot};
use crate::stream::EntityStream;
use crate::topology::eligibility::{self, Assignability, Candidate, Role};
use crate::topology::ops;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable. Owns the REST client and the [`DataStore`]; every
/// write goes through [`execute`](Self::execute).
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    store: Arc<DataStore>,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    client: Mutex<Option<Arc<RestClient>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller with a fresh store. Does not connect.
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_store(config, Arc::new(DataStore::new()))
    }

    /// Create a controller around an existing store.
    pub fn with_store(config: ControllerConfig, store: Arc<DataStore>) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                connection_state,
                cancel: CancellationToken::new(),
                client: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Authenticate, load every collection, and start the refresh task
    /// when one is configured.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let config = &self.inner.config;
        let client = match self.authenticated_client().await {
            Ok(c) => c,
            Err(e) => {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                return Err(e);
            }
        };
        *self.inner.client.lock().await = Some(Arc::new(client));

        if let Err(e) = self.full_refresh().await {
            self.inner.connection_state.send_replace(ConnectionState::Failed);
            return Err(e);
        }

        let interval_secs = config.refresh_interval_secs;
        if interval_secs > 0 {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(ctrl, interval_secs, cancel)));
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connected);
        info!(url = %config.url, "connected to controller");
        Ok(())
    }

    async fn authenticated_client(&self) -> Result<RestClient, CoreError> {
        let config = &self.inner.config;
        let client = RestClient::new(config.url.clone(), &config.transport())?;
        client.authenticate(&config.auth.to_api()).await?;
        debug!("authenticated");
        Ok(client)
    }

    /// Trade username/password for a session token without loading data.
    pub async fn login(config: &ControllerConfig) -> Result<SecretString, CoreError> {
        let AuthCredentials::Credentials { username, password } = &config.auth else {
            return Err(CoreError::Config {
                message: "login needs a username and password".into(),
            });
        };
        let client = RestClient::new(config.url.clone(), &config.transport())?;
        Ok(client.login(username, password).await?)
    }

    /// Stop background tasks and drop the session.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        if let Some(client) = self.inner.client.lock().await.take() {
            client.clear_token();
        }
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    async fn client(&self) -> Result<Arc<RestClient>, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::Disconnected)
    }

    /// Fetch everything and replace the store's contents.
    ///
    /// Networks, hosts, nodes and users must load; the remaining
    /// collections are best effort and keep their previous contents when
    /// their fetch fails.
    pub async fn full_refresh(&self) -> Result<(), CoreError> {
        let client = self.client().await?;

        let (networks, hosts, nodes, users) = tokio::join!(
            client.list_networks(),
            client.list_hosts(),
            client.list_nodes(),
            client.list_users(),
        );
        let networks: Vec<Network> = networks?.into_iter().map(Network::from).collect();
        let hosts: Vec<Host> = hosts?.into_iter().map(Host::from).collect();
        let nodes: Vec<Node> = nodes?.into_iter().map(Node::from).collect();
        let users: Vec<User> = users?.into_iter().map(User::from).collect();

        let netids: Vec<String> = networks.iter().map(|n| n.name.clone()).collect();
        let per_network = join_all(netids.iter().map(|net| {
            let client = Arc::clone(&client);
            async move {
                tokio::join!(
                    client.list_acls(net),
                    client.list_tags(net),
                    client.list_dns(net)
                )
            }
        }));

        let (
            (ext_clients, groups, platform_roles, network_roles),
            (keys, server_config, server_status),
            per_network,
        ) = tokio::join!(
            async {
                tokio::join!(
                    client.list_ext_clients(),
                    client.list_user_groups(),
                    client.list_user_roles(true),
                    client.list_user_roles(false),
                )
            },
            async {
                tokio::join!(
                    client.list_enrollment_keys(),
                    client.get_server_config(),
                    client.get_server_status(),
                )
            },
            per_network,
        );

        let mut acls = Some(Vec::new());
        let mut tags = Some(Vec::new());
        let mut dns = Some(Vec::new());
        for (net, (acl_res, tag_res, dns_res)) in netids.iter().zip(per_network) {
            merge(&mut acls, "acls", net, acl_res);
            merge(&mut tags, "tags", net, tag_res);
            merge(&mut dns, "dns entries", net, dns_res);
        }

        let user_roles = match (platform_roles, network_roles) {
            (Ok(mut p), Ok(n)) => {
                p.extend(n);
                Some(p.into_iter().map(UserRole::from).collect())
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "could not load user roles");
                None
            }
        };

        let server_info = match server_config {
            Ok(cfg) => {
                let mut info = ServerInfo::from(cfg);
                if let Ok(status) = server_status {
                    info.db_connected = Some(status.db_connected);
                    info.broker_connected = Some(status.broker_connected);
                }
                Some(info)
            }
            Err(e) => {
                warn!(error = %e, "could not load server config");
                None
            }
        };

        let snapshot = RefreshSnapshot {
            networks,
            hosts,
            nodes,
            users,
            ext_clients: optional("external clients", ext_clients),
            user_groups: optional("user groups", groups),
            user_roles,
            acls,
            tags,
            dns_entries: dns,
            enrollment_keys: optional("enrollment keys", keys),
            server_info,
        };
        self.inner.store.apply_snapshot(snapshot);

        debug!(
            networks = self.inner.store.network_count(),
            hosts = self.inner.store.host_count(),
            nodes = self.inner.store.node_count(),
            "data refresh complete"
        );
        Ok(())
    }

    // ── Command execution ────────────────────────────────────────

    /// Validate and run one command, applying its results to the store.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        cmd.validate()?;
        if *self.inner.connection_state.borrow() != ConnectionState::Connected {
            return Err(CoreError::Disconnected);
        }
        route_command(self, cmd).await
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// Connect, run `f`, disconnect. No background refresh.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.refresh_interval_secs = 0;

        let controller = Controller::new(cfg);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── Queries ──────────────────────────────────────────────────

    /// WireGuard config text for an external client.
    pub async fn ext_client_config(
        &self,
        network: &str,
        client_id: &str,
    ) -> Result<String, CoreError> {
        let client = self.client().await?;
        client
            .get_ext_client_config(network, client_id)
            .await
            .map_err(|e| not_found_as(e, "external client", client_id))
    }

    /// Picker candidates for `role` among `network`'s nodes.
    pub fn candidates(&self, network: &str, role: &Role) -> Vec<Candidate> {
        eligibility::candidates(self.inner.store.nodes_in_network(network), role)
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn server_info(&self) -> Option<Arc<ServerInfo>> {
        self.inner.store.server_info()
    }

    // ── Snapshot accessors (delegate to DataStore) ───────────────

    pub fn networks_snapshot(&self) -> Arc<Vec<Arc<Network>>> {
        self.inner.store.networks_snapshot()
    }

    pub fn hosts_snapshot(&self) -> Arc<Vec<Arc<Host>>> {
        self.inner.store.hosts_snapshot()
    }

    pub fn extended_nodes(&self) -> Vec<ExtendedNode> {
        self.inner.store.extended_nodes()
    }

    pub fn ext_clients_snapshot(&self) -> Arc<Vec<Arc<ExtClient>>> {
        self.inner.store.ext_clients_snapshot()
    }

    pub fn users_snapshot(&self) -> Arc<Vec<Arc<User>>> {
        self.inner.store.users_snapshot()
    }

    pub fn user_groups_snapshot(&self) -> Arc<Vec<Arc<UserGroup>>> {
        self.inner.store.user_groups_snapshot()
    }

    pub fn user_roles_snapshot(&self) -> Arc<Vec<Arc<UserRole>>> {
        self.inner.store.user_roles_snapshot()
    }

    pub fn acls_snapshot(&self) -> Arc<Vec<Arc<AclRule>>> {
        self.inner.store.acls_snapshot()
    }

    pub fn tags_snapshot(&self) -> Arc<Vec<Arc<Tag>>> {
        self.inner.store.tags_snapshot()
    }

    pub fn dns_entries_snapshot(&self) -> Arc<Vec<Arc<DnsEntry>>> {
        self.inner.store.dns_entries_snapshot()
    }

    pub fn enrollment_keys_snapshot(&self) -> Arc<Vec<Arc<EnrollmentKey>>> {
        self.inner.store.enrollment_keys_snapshot()
    }

    // ── Stream accessors (delegate to DataStore) ─────────────────

    pub fn networks(&self) -> EntityStream<Network> {
        self.inner.store.subscribe_networks()
    }

    pub fn nodes(&self) -> EntityStream<Node> {
        self.inner.store.subscribe_nodes()
    }

    pub fn hosts(&self) -> EntityStream<Host> {
        self.inner.store.subscribe_hosts()
    }
}

// ── Refresh helpers ──────────────────────────────────────────────

fn optional<T, U: From<T>>(what: &str, res: Result<Vec<T>, meshdeck_api::Error>) -> Option<Vec<U>> {
    match res {
        Ok(items) => Some(items.into_iter().map(U::from).collect()),
        Err(e) => {
            warn!(error = %e, "could not load {what}");
            None
        }
    }
}

/// Fold one network's fetch into the running list; any failure turns the
/// whole collection into `None` so the store keeps its old contents.
fn merge<T, U: From<T>>(
    acc: &mut Option<Vec<U>>,
    what: &str,
    network: &str,
    res: Result<Vec<T>, meshdeck_api::Error>,
) {
    match res {
        Ok(items) => {
            if let Some(list) = acc.as_mut() {
                list.extend(items.into_iter().map(U::from));
            }
        }
        Err(e) => {
            warn!(network, error = %e, "could not load {what}");
            *acc = None;
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn refresh_task(controller: Controller, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.full_refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let client = controller.client().await?;
    let store = &controller.inner.store;

    match cmd {
        // ── Networks ─────────────────────────────────────────────

        Command::CreateNetwork(req) => {
            let body = NetworkResponse {
                netid: req.name,
                addressrange: req.ipv4_range.unwrap_or_default(),
                addressrange6: req.ipv6_range.unwrap_or_default(),
                defaultacl: yes_no(req.default_acl == DefaultAclPolicy::Allow).to_owned(),
                nameservers: req.nameservers,
                defaultkeepalive: req.default_keepalive.map_or(20, to_i32),
                defaultmtu: req.default_mtu.map_or(1420, to_i32),
                ..NetworkResponse::default()
            };
            let network = Network::from(client.create_network(&body).await?);
            store.upsert_network(network.clone());
            info!(network = %network.name, "network created");
            Ok(CommandResult::Network(network))
        }

        Command::UpdateNetwork { network, update } => {
            let mut current = client
                .get_network(&network)
                .await
                .map_err(|e| network_not_found(e, &network))?;
            if let Some(v4) = update.ipv4_range {
                current.addressrange = v4;
            }
            if let Some(v6) = update.ipv6_range {
                current.addressrange6 = v6;
            }
            if let Some(acl) = update.default_acl {
                current.defaultacl = yes_no(acl == DefaultAclPolicy::Allow).to_owned();
            }
            if let Some(ns) = update.nameservers {
                current.nameservers = ns;
            }
            if let Some(k) = update.default_keepalive {
                current.defaultkeepalive = to_i32(k);
            }
            if let Some(mtu) = update.default_mtu {
                current.defaultmtu = to_i32(mtu);
            }
            let network = Network::from(client.update_network(&current).await?);
            store.upsert_network(network.clone());
            Ok(CommandResult::Network(network))
        }

        Command::DeleteNetwork { network } => {
            client
                .delete_network(&network)
                .await
                .map_err(|e| network_not_found(e, &network))?;
            store.remove_network(&network);
            info!(network = %network, "network deleted");
            Ok(CommandResult::Ok)
        }

        // ── Hosts & nodes ────────────────────────────────────────

        Command::UpdateHost { id, update } => {
            let mut host = fetch_host(&client, &id).await?;
            if let Some(name) = update.name {
                host.name = name;
            }
            if let Some(port) = update.listen_port {
                host.listenport = to_i32(port);
            }
            if let Some(mtu) = update.mtu {
                host.mtu = to_i32(mtu);
            }
            if let Some(ka) = update.persistent_keepalive {
                host.persistentkeepalive = to_i32(ka);
            }
            if let Some(d) = update.is_default {
                host.isdefault = d;
            }
            if let Some(s) = update.is_static {
                host.isstatic = s;
            }
            if let Some(ip) = update.endpoint_ip {
                host.endpointip = ip;
            }
            let host = Host::from(client.update_host(&host).await?);
            store.upsert_host(host.clone());
            Ok(CommandResult::Host(host))
        }

        Command::DeleteHost { id } => {
            client
                .delete_host(&id.to_string())
                .await
                .map_err(|e| host_not_found(e, &id))?;
            store.remove_host(&id);
            Ok(CommandResult::Ok)
        }

        Command::AddHostToNetwork { host, network } => {
            client
                .add_host_to_network(&host.to_string(), &network)
                .await?;
            let nodes = refresh_network_nodes(&client, store, &network).await?;
            refresh_host(&client, store, &host).await;
            info!(%host, network = %network, "host joined network");
            Ok(nodes
                .into_iter()
                .find(|n| n.host_id == host)
                .map_or(CommandResult::Ok, CommandResult::Node))
        }

        Command::RemoveHostFromNetwork { host, network } => {
            client
                .remove_host_from_network(&host.to_string(), &network)
                .await?;
            if let Some(node) = store.node_for_host(&network, &host) {
                store.remove_node(&node.id);
            }
            refresh_host(&client, store, &host).await;
            Ok(CommandResult::Ok)
        }

        Command::DeleteNode { network, id } => {
            client
                .delete_node(&network, &id.to_string())
                .await
                .map_err(|e| node_not_found(e, &id))?;
            store.remove_node(&id);
            Ok(CommandResult::Ok)
        }

        // ── Relays ───────────────────────────────────────────────

        Command::CreateRelay {
            network,
            relay,
            relayed,
        } => {
            let relay = resolve_target(&client, store, &network, &relay).await?;
            let relay_node = Node::from(relay.clone());
            ensure(store, &relay_node, &eligibility::as_relay(&relay_node))?;
            check_relayed(store, &network, &relay_node.id, &relayed)?;

            let body = CreateRelayRequest {
                netid: network.clone(),
                nodeid: relay.id.clone(),
                relayaddrs: relayed.iter().map(ToString::to_string).collect(),
            };
            let updated = Node::from(client.create_relay(&body).await?);
            refresh_network_nodes(&client, store, &network).await?;
            Ok(CommandResult::Node(updated))
        }

        Command::UpdateRelayedNodes {
            network,
            relay,
            relayed,
        } => {
            refresh_network_nodes(&client, store, &network).await?;
            let relay_node = store_node(store, &relay)?;
            if !relay_node.is_relay {
                return Err(not_eligible(store, &relay_node, "node is not a relay"));
            }
            check_relayed(store, &network, &relay, &relayed)?;

            let mut wire = client
                .get_node(&network, &relay.to_string())
                .await
                .map_err(|e| node_not_found(e, &relay))?;
            wire.relaynodes = relayed.iter().map(ToString::to_string).collect();
            let updated = Node::from(client.update_node(&wire).await?);
            refresh_network_nodes(&client, store, &network).await?;
            Ok(CommandResult::Node(updated))
        }

        Command::ReassignRelayedNode {
            network,
            node,
            from,
            to,
        } => {
            refresh_network_nodes(&client, store, &network).await?;
            let moving = store_node(store, &node)?;
            if moving.relayed_by.as_ref() != Some(&from) {
                return Err(not_eligible(
                    store,
                    &moving,
                    &format!("not relayed by {from}"),
                ));
            }
            let target = store_node(store, &to)?;
            if !target.is_relay {
                return Err(not_eligible(store, &target, "node is not a relay"));
            }
            ensure(
                store,
                &moving,
                &eligibility::as_relayed_node(&moving, Some(&from)),
            )?;

            let moved = ops::reassign_relayed_node(
                client.as_ref(),
                &network,
                &node.to_string(),
                &from.to_string(),
                &to.to_string(),
            )
            .await?;
            refresh_network_nodes(&client, store, &network).await?;
            Ok(CommandResult::Nodes(vec![
                Node::from(moved.old_relay),
                Node::from(moved.new_relay),
            ]))
        }

        Command::DeleteRelay { network, relay } => {
            let updated = Node::from(
                client
                    .delete_relay(&network, &relay.to_string())
                    .await
                    .map_err(|e| node_not_found(e, &relay))?,
            );
            refresh_network_nodes(&client, store, &network).await?;
            Ok(CommandResult::Node(updated))
        }

        // ── Egress ───────────────────────────────────────────────

        Command::CreateEgress {
            network,
            node,
            request,
        } => {
            let target = resolve_target(&client, store, &network, &node).await?;
            let target_node = Node::from(target.clone());
            ensure(store, &target_node, &eligibility::as_egress_gateway(&target_node))?;

            let ranges: IndexSet<IpNet> = request.parsed_ranges().into_iter().collect();
            let body = EgressGatewayRequest {
                ranges: ranges.iter().map(ToString::to_string).collect(),
                natenabled: yes_no(request.nat).to_owned(),
            };
            let updated = Node::from(client.create_egress(&network, &target.id, &body).await?);
            store.upsert_node(updated.clone());
            Ok(CommandResult::Node(updated))
        }

        Command::UpdateEgressRanges {
            network,
            node,
            ranges,
        } => {
            let parsed = requests::parse_ranges(&ranges)?;
            let updated = Node::from(
                ops::replace_egress_ranges(client.as_ref(), &network, &node.to_string(), &parsed)
                    .await?,
            );
            store.upsert_node(updated.clone());
            Ok(CommandResult::Node(updated))
        }

        Command::DeleteEgress { network, node } => {
            let updated = Node::from(
                client
                    .delete_egress(&network, &node.to_string())
                    .await
                    .map_err(|e| node_not_found(e, &node))?,
            );
            store.upsert_node(updated.clone());
            Ok(CommandResult::Node(updated))
        }

        // ── Ingress ──────────────────────────────────────────────

        Command::CreateIngress {
            network,
            node,
            request,
        } => {
            let target = resolve_target(&client, store, &network, &node).await?;
            let target_node = Node::from(target.clone());
            ensure(store, &target_node, &eligibility::as_ingress_gateway(&target_node))?;

            let body = IngressGatewayRequest {
                extclientdns: request.dns.unwrap_or_default(),
            };
            let updated = Node::from(client.create_ingress(&network, &target.id, &body).await?);
            store.upsert_node(updated.clone());
            Ok(CommandResult::Node(updated))
        }

        Command::DeleteIngress { network, node } => {
            let updated = Node::from(
                client
                    .delete_ingress(&network, &node.to_string())
                    .await
                    .map_err(|e| node_not_found(e, &node))?,
            );
            store.upsert_node(updated.clone());
            // Clients attached to the gateway go with it.
            store.ext_clients.remove_where(|c| c.gateway_id == node);
            Ok(CommandResult::Node(updated))
        }

        // ── Internet gateways ────────────────────────────────────

        Command::CreateInternetGateway {
            network,
            node,
            clients,
        } => {
            let target = resolve_target(&client, store, &network, &node).await?;
            let gateway = Node::from(target.clone());
            ensure(store, &gateway, &eligibility::as_internet_gateway(&gateway))?;
            check_inet_clients(store, &gateway.id, &clients)?;

            let body = inet_request(&clients);
            let updated = Node::from(
                client
                    .create_internet_gateway(&network, &target.id, &body)
                    .await?,
            );
            refresh_network_nodes(&client, store, &network).await?;
            Ok(CommandResult::Node(updated))
        }

        Command::UpdateInternetGateway {
            network,
            node,
            clients,
        } => {
            refresh_network_nodes(&client, store, &network).await?;
            let gateway = store_node(store, &node)?;
            if !gateway.is_internet_gateway {
                return Err(not_eligible(store, &gateway, "node is not an internet gateway"));
            }
            check_inet_clients(store, &node, &clients)?;

            let body = inet_request(&clients);
            let updated = Node::from(
                client
                    .update_internet_gateway(&network, &node.to_string(), &body)
                    .await?,
            );
            refresh_network_nodes(&client, store, &network).await?;
            Ok(CommandResult::Node(updated))
        }

        Command::DeleteInternetGateway { network, node } => {
            let updated = Node::from(
                client
                    .delete_internet_gateway(&network, &node.to_string())
                    .await
                    .map_err(|e| node_not_found(e, &node))?,
            );
            refresh_network_nodes(&client, store, &network).await?;
            Ok(CommandResult::Node(updated))
        }

        // ── External clients ─────────────────────────────────────

        Command::CreateExtClient { network, request } => {
            let gateway = client
                .get_node(&network, &request.gateway.to_string())
                .await
                .map_err(|e| node_not_found(e, &request.gateway))?;
            if !gateway.isingressgateway {
                let node = Node::from(gateway);
                return Err(not_eligible(store, &node, "not a remote-access gateway"));
            }

            let before: HashSet<String> = store
                .ext_clients_in_network(&network)
                .iter()
                .map(|c| c.name.clone())
                .collect();
            let body = ExtClientRequest {
                clientid: request.client_id.clone().unwrap_or_default(),
                publickey: request.public_key.unwrap_or_default(),
                dns: request.dns.unwrap_or_default(),
                extraallowedips: request.extra_allowed_ips,
                enabled: request.enabled,
                tags: BTreeMap::new(),
            };
            client
                .create_ext_client(&network, &gateway.id, &body)
                .await?;

            // The create endpoint returns no body; find the new record.
            let listed = client.list_network_ext_clients(&network).await?;
            let mut created = None;
            for raw in listed {
                let ext = ExtClient::from(raw);
                let is_new = match &request.client_id {
                    Some(id) => &ext.name == id,
                    None => !before.contains(&ext.name),
                };
                if is_new && created.is_none() {
                    created = Some(ext.clone());
                }
                store.upsert_ext_client(ext);
            }
            Ok(created.map_or(CommandResult::Ok, CommandResult::ExtClient))
        }

        Command::UpdateExtClient {
            network,
            client_id,
            update,
        } => {
            let current = fetch_ext_client(&client, &network, &client_id).await?;
            let mut body = ext_client_body(current);
            if let Some(id) = update.new_client_id {
                body.clientid = id;
            }
            if let Some(key) = update.public_key {
                body.publickey = key;
            }
            if let Some(dns) = update.dns {
                body.dns = dns;
            }
            if let Some(ips) = update.extra_allowed_ips {
                body.extraallowedips = ips;
            }
            if let Some(enabled) = update.enabled {
                body.enabled = enabled;
            }
            let updated = ExtClient::from(client.update_ext_client(&network, &client_id, &body).await?);
            store.remove_ext_client(&network, &client_id);
            store.upsert_ext_client(updated.clone());
            Ok(CommandResult::ExtClient(updated))
        }

        Command::SetExtClientEnabled {
            network,
            client_id,
            enabled,
        } => {
            let current = fetch_ext_client(&client, &network, &client_id).await?;
            let mut body = ext_client_body(current);
            body.enabled = enabled;
            let updated = ExtClient::from(client.update_ext_client(&network, &client_id, &body).await?);
            store.upsert_ext_client(updated.clone());
            Ok(CommandResult::ExtClient(updated))
        }

        Command::DeleteExtClient { network, client_id } => {
            client
                .delete_ext_client(&network, &client_id)
                .await
                .map_err(|e| not_found_as(e, "external client", &client_id))?;
            store.remove_ext_client(&network, &client_id);
            Ok(CommandResult::Ok)
        }

        // ── Users ────────────────────────────────────────────────

        Command::CreateUser(req) => {
            let body = UserRequest {
                username: req.username,
                password: Some(req.password),
                isadmin: req.platform_role == PlatformRole::Admin,
                issuperadmin: false,
                platform_role_id: req.platform_role.as_str().to_owned(),
                network_roles: role_map_to_wire(&req.network_roles),
                user_group_ids: set_to_wire(&req.groups),
            };
            let user = User::from(client.create_user(&body).await?);
            store.upsert_user(user.clone());
            Ok(CommandResult::User(user))
        }

        Command::UpdateUser { username, update } => {
            let current = client
                .get_user(&username)
                .await
                .map_err(|e| not_found_as(e, "user", &username))?;
            let mut body = user_body(current);
            body.password = update.password;
            if let Some(role) = update.platform_role {
                body.isadmin = role == PlatformRole::Admin;
                body.platform_role_id = role.as_str().to_owned();
            }
            if let Some(roles) = update.network_roles {
                body.network_roles = role_map_to_wire(&roles);
            }
            if let Some(groups) = update.groups {
                body.user_group_ids = set_to_wire(&groups);
            }
            let user = User::from(client.update_user(&body).await?);
            store.upsert_user(user.clone());
            Ok(CommandResult::User(user))
        }

        Command::DeleteUser { username } => {
            client
                .delete_user(&username)
                .await
                .map_err(|e| not_found_as(e, "user", &username))?;
            store.remove_user(&username);
            Ok(CommandResult::Ok)
        }

        Command::CreateUserGroup(req) => {
            let body = WireCreateGroup {
                user_group: UserGroupResponse {
                    id: req.name,
                    network_roles: role_map_to_wire(&req.network_roles),
                    meta_data: req.description,
                    ..UserGroupResponse::default()
                },
                members: req.members,
            };
            let group = UserGroup::from(client.create_user_group(&body).await?);
            store.upsert_user_group(group.clone());
            Ok(CommandResult::UserGroup(group))
        }

        Command::UpdateUserGroup { id, update } => {
            let wanted = id.to_string();
            let mut current = client
                .list_user_groups()
                .await?
                .into_iter()
                .find(|g| g.id == wanted)
                .ok_or_else(|| not_found("user group", &wanted))?;
            if let Some(desc) = update.description {
                current.meta_data = desc;
            }
            if let Some(roles) = update.network_roles {
                current.network_roles = role_map_to_wire(&roles);
            }
            let group = UserGroup::from(client.update_user_group(&current).await?);
            store.upsert_user_group(group.clone());
            Ok(CommandResult::UserGroup(group))
        }

        Command::DeleteUserGroup { id } => {
            client
                .delete_user_group(&id.to_string())
                .await
                .map_err(|e| not_found_as(e, "user group", &id.to_string()))?;
            store.remove_user_group(&id);
            Ok(CommandResult::Ok)
        }

        // ── ACL ──────────────────────────────────────────────────

        Command::CreateAcl(req) => {
            let body = AclResponse {
                name: req.name,
                network_id: req.network,
                meta_data: req.description,
                policy_type: req.policy_type.wire().to_owned(),
                src_type: req.sources.iter().map(acl_member_to_wire).collect(),
                dst_type: req.destinations.iter().map(acl_member_to_wire).collect(),
                allowed_traffic_direction: req.direction.wire(),
                enabled: req.enabled,
                ..AclResponse::default()
            };
            let acl = AclRule::from(client.create_acl(&body).await?);
            store.upsert_acl(acl.clone());
            Ok(CommandResult::AclRule(acl))
        }

        Command::UpdateAcl { id, update } => {
            let known = store
                .acl_by_id(&id)
                .ok_or_else(|| not_found("ACL rule", &id.to_string()))?;
            update.validate_for(known.policy_type)?;

            let wanted = id.to_string();
            let mut current = client
                .list_acls(&known.network)
                .await?
                .into_iter()
                .find(|a| a.id == wanted)
                .ok_or_else(|| not_found("ACL rule", &wanted))?;
            if let Some(name) = update.name {
                current.name = name;
            }
            if let Some(src) = update.sources {
                current.src_type = src.iter().map(acl_member_to_wire).collect();
            }
            if let Some(dst) = update.destinations {
                current.dst_type = dst.iter().map(acl_member_to_wire).collect();
            }
            if let Some(dir) = update.direction {
                current.allowed_traffic_direction = dir.wire();
            }
            if let Some(enabled) = update.enabled {
                current.enabled = enabled;
            }
            if let Some(desc) = update.description {
                current.meta_data = desc;
            }
            let acl = AclRule::from(client.update_acl(&current).await?);
            store.upsert_acl(acl.clone());
            Ok(CommandResult::AclRule(acl))
        }

        Command::DeleteAcl { id } => {
            if store.acl_by_id(&id).is_some_and(|a| a.is_default) {
                return Err(CoreError::Rejected {
                    message: format!("{id} is a default policy and cannot be deleted"),
                });
            }
            client
                .delete_acl(&id.to_string())
                .await
                .map_err(|e| not_found_as(e, "ACL rule", &id.to_string()))?;
            store.remove_acl(&id);
            Ok(CommandResult::Ok)
        }

        // ── Tags ─────────────────────────────────────────────────

        Command::CreateTag(req) => {
            let body = WireCreateTag {
                tag_name: req.name,
                network: req.network,
                tagged_nodes: tagged_refs(&req.nodes),
            };
            let tag = Tag::from(client.create_tag(&body).await?);
            store.upsert_tag(tag.clone());
            Ok(CommandResult::Tag(tag))
        }

        Command::UpdateTag { id, update } => {
            let current = store
                .tag_by_id(&id)
                .ok_or_else(|| not_found("tag", &id.to_string()))?;
            let body = WireUpdateTag {
                id: id.to_string(),
                new_name: update.new_name.unwrap_or_default(),
                network: current.network.clone(),
                tagged_nodes: tagged_refs(update.nodes.as_ref().unwrap_or(&current.tagged_nodes)),
            };
            let tag = Tag::from(client.update_tag(&body).await?);
            if tag.id != id {
                store.remove_tag(&id);
            }
            store.upsert_tag(tag.clone());
            Ok(CommandResult::Tag(tag))
        }

        Command::DeleteTag { id } => {
            client
                .delete_tag(&id.to_string())
                .await
                .map_err(|e| not_found_as(e, "tag", &id.to_string()))?;
            store.remove_tag(&id);
            Ok(CommandResult::Ok)
        }

        // ── DNS ──────────────────────────────────────────────────

        Command::CreateDnsEntry(req) => {
            let body = DnsEntryResponse {
                address: req.address.unwrap_or_default(),
                address6: req.address6.unwrap_or_default(),
                name: req.name,
                network: req.network.clone(),
            };
            let entry = DnsEntry::from(client.create_dns(&req.network, &body).await?);
            store.upsert_dns_entry(entry.clone());
            Ok(CommandResult::DnsEntry(entry))
        }

        Command::DeleteDnsEntry { network, name } => {
            client
                .delete_dns(&network, &name)
                .await
                .map_err(|e| not_found_as(e, "DNS entry", &name))?;
            store.remove_dns_entry(&network, &name);
            Ok(CommandResult::Ok)
        }

        // ── Enrollment keys ──────────────────────────────────────

        Command::CreateEnrollmentKey(req) => {
            let key_type = if req.unlimited {
                EnrollmentKeyType::Unlimited
            } else if req.uses.is_some() {
                EnrollmentKeyType::Uses
            } else {
                EnrollmentKeyType::TimeExpiration
            };
            let body = EnrollmentKeyRequest {
                expiration: req.expiration.map_or(0, |e| e.timestamp()),
                uses_remaining: req.uses.map_or(0, to_i32),
                networks: req.networks,
                unlimited: req.unlimited,
                tags: req.tags,
                key_type: key_type.wire(),
            };
            let key = EnrollmentKey::from(client.create_enrollment_key(&body).await?);
            store.upsert_enrollment_key(key.clone());
            Ok(CommandResult::EnrollmentKey(key))
        }

        Command::UpdateEnrollmentKey { id, update } => {
            let current = store
                .enrollment_key_by_id(&id)
                .ok_or_else(|| not_found("enrollment key", &id.to_string()))?;
            let body = EnrollmentKeyRequest {
                expiration: current.expiration.map_or(0, |e| e.timestamp()),
                uses_remaining: to_i32(current.uses_remaining),
                networks: update.networks.unwrap_or_else(|| current.networks.clone()),
                unlimited: current.unlimited,
                tags: update.tags.unwrap_or_else(|| current.tags.clone()),
                key_type: current.key_type.wire(),
            };
            let key = EnrollmentKey::from(
                client
                    .update_enrollment_key(&id.to_string(), &body)
                    .await?,
            );
            store.upsert_enrollment_key(key.clone());
            Ok(CommandResult::EnrollmentKey(key))
        }

        Command::DeleteEnrollmentKey { id } => {
            client
                .delete_enrollment_key(&id.to_string())
                .await
                .map_err(|e| not_found_as(e, "enrollment key", &id.to_string()))?;
            store.remove_enrollment_key(&id);
            Ok(CommandResult::Ok)
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn not_found(entity_type: &str, identifier: &str) -> CoreError {
    CoreError::NotFound {
        entity_type: entity_type.into(),
        identifier: identifier.into(),
    }
}

/// Name the entity in a server 404 instead of echoing the server text.
fn not_found_as(err: meshdeck_api::Error, entity_type: &str, identifier: &str) -> CoreError {
    if err.is_not_found() {
        not_found(entity_type, identifier)
    } else {
        err.into()
    }
}

fn network_not_found(err: meshdeck_api::Error, netid: &str) -> CoreError {
    if err.is_not_found() {
        CoreError::NetworkNotFound {
            identifier: netid.into(),
        }
    } else {
        err.into()
    }
}

fn host_not_found(err: meshdeck_api::Error, id: &EntityId) -> CoreError {
    if err.is_not_found() {
        CoreError::HostNotFound {
            identifier: id.to_string(),
        }
    } else {
        err.into()
    }
}

fn node_not_found(err: meshdeck_api::Error, id: &EntityId) -> CoreError {
    if err.is_not_found() {
        CoreError::NodeNotFound {
            identifier: id.to_string(),
        }
    } else {
        err.into()
    }
}

fn display_name(store: &DataStore, node: &Node) -> String {
    store
        .host_by_id(&node.host_id)
        .map_or_else(|| node.id.to_string(), |h| h.name.clone())
}

fn not_eligible(store: &DataStore, node: &Node, reason: &str) -> CoreError {
    CoreError::NotEligible {
        node: display_name(store, node),
        reason: reason.into(),
    }
}

fn ensure(store: &DataStore, node: &Node, verdict: &Assignability) -> Result<(), CoreError> {
    match verdict.reason() {
        None => Ok(()),
        Some(reason) => Err(not_eligible(store, node, &reason.to_string())),
    }
}

fn store_node(store: &DataStore, id: &EntityId) -> Result<Arc<Node>, CoreError> {
    store.node_by_id(id).ok_or_else(|| CoreError::NodeNotFound {
        identifier: id.to_string(),
    })
}

fn check_relayed(
    store: &DataStore,
    network: &str,
    relay: &EntityId,
    relayed: &[EntityId],
) -> Result<(), CoreError> {
    for id in relayed {
        if id == relay {
            return Err(CoreError::Rejected {
                message: "a relay cannot relay itself".into(),
            });
        }
        let node = store_node(store, id)?;
        if node.network != network {
            return Err(not_eligible(store, &node, &format!("not in network {network}")));
        }
        ensure(store, &node, &eligibility::as_relayed_node(&node, Some(relay)))?;
    }
    Ok(())
}

fn check_inet_clients(
    store: &DataStore,
    gateway: &EntityId,
    clients: &[EntityId],
) -> Result<(), CoreError> {
    for id in clients {
        let node = store_node(store, id)?;
        ensure(
            store,
            &node,
            &eligibility::as_internet_gateway_client(&node, Some(gateway)),
        )?;
    }
    Ok(())
}

fn inet_request(clients: &[EntityId]) -> InetNodeRequest {
    InetNodeRequest {
        inet_node_client_ids: clients.iter().map(ToString::to_string).collect(),
    }
}

fn tagged_refs(nodes: &[EntityId]) -> Vec<TaggedNodeRef> {
    nodes
        .iter()
        .map(|id| TaggedNodeRef { id: id.to_string() })
        .collect()
}

fn role_map_to_wire(
    roles: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, BTreeMap<String, Value>> {
    roles
        .iter()
        .map(|(net, ids)| (net.clone(), set_to_wire(ids)))
        .collect()
}

/// `["a", "b"]` → `{"a": {}, "b": {}}`
fn set_to_wire(ids: &[String]) -> BTreeMap<String, Value> {
    ids.iter()
        .map(|id| (id.clone(), Value::Object(serde_json::Map::new())))
        .collect()
}

fn user_body(current: UserResponse) -> UserRequest {
    UserRequest {
        username: current.username,
        password: None,
        isadmin: current.isadmin,
        issuperadmin: current.issuperadmin,
        platform_role_id: current.platform_role_id,
        network_roles: current.network_roles,
        user_group_ids: current.user_group_ids,
    }
}

fn ext_client_body(current: ExtClientResponse) -> ExtClientRequest {
    ExtClientRequest {
        clientid: current.clientid,
        publickey: current.publickey,
        dns: current.dns,
        extraallowedips: current.extraallowedips,
        enabled: current.enabled,
        tags: current.tags,
    }
}

async fn fetch_host(client: &RestClient, id: &EntityId) -> Result<HostResponse, CoreError> {
    let wanted = id.to_string();
    client
        .list_hosts()
        .await?
        .into_iter()
        .find(|h| h.id == wanted)
        .ok_or(CoreError::HostNotFound { identifier: wanted })
}

async fn fetch_ext_client(
    client: &RestClient,
    network: &str,
    client_id: &str,
) -> Result<ExtClientResponse, CoreError> {
    client
        .get_ext_client(network, client_id)
        .await
        .map_err(|e| not_found_as(e, "external client", client_id))
}

/// Re-read one host so its network list is current.
async fn refresh_host(client: &RestClient, store: &DataStore, id: &EntityId) {
    match fetch_host(client, id).await {
        Ok(host) => store.upsert_host(Host::from(host)),
        Err(e) => warn!(host = %id, error = %e, "could not refresh host"),
    }
}

/// Re-read a network's nodes into the store after a topology change.
async fn refresh_network_nodes(
    client: &RestClient,
    store: &DataStore,
    network: &str,
) -> Result<Vec<Node>, CoreError> {
    let nodes: Vec<Node> = client
        .list_network_nodes(network)
        .await
        .map_err(|e| network_not_found(e, network))?
        .into_iter()
        .map(Node::from)
        .collect();
    store.nodes.remove_where(|n| n.network == network);
    store.upsert_nodes(nodes.iter().cloned());
    Ok(nodes)
}

/// Resolve a [`NodeTarget`] to the node's current server record.
async fn resolve_target(
    client: &RestClient,
    store: &DataStore,
    network: &str,
    target: &NodeTarget,
) -> Result<NodeResponse, CoreError> {
    match target {
        NodeTarget::Node(id) => client
            .get_node(network, &id.to_string())
            .await
            .map_err(|e| node_not_found(e, id)),
        NodeTarget::Host(host_id) => {
            let wanted = host_id.to_string();
            let nodes = client
                .list_network_nodes(network)
                .await
                .map_err(|e| network_not_found(e, network))?;
            store.upsert_nodes(nodes.iter().cloned().map(Node::from));
            nodes
                .into_iter()
                .find(|n| n.hostid == wanted)
                .ok_or_else(|| CoreError::NodeNotFound {
                    identifier: format!("host {wanted} in network {network}"),
                })
        }
    }
}
