// ── Command API ──
//
// Every write goes through the `Command` enum. The controller validates
// the payload, issues the REST calls and applies the results to the store.

pub mod requests;

use crate::model::{
    AclRule, DnsEntry, EnrollmentKey, EntityId, ExtClient, Host, Network, Node, Tag, User,
    UserGroup,
};
use crate::validate::ValidationErrors;

pub use requests::{
    CreateAclRequest, CreateDnsEntryRequest, CreateEgressRequest, CreateEnrollmentKeyRequest,
    CreateExtClientRequest, CreateIngressRequest, CreateNetworkRequest, CreateTagRequest,
    CreateUserGroupRequest, CreateUserRequest, NodeTarget, UpdateAclRequest,
    UpdateEnrollmentKeyRequest, UpdateExtClientRequest, UpdateHostRequest, UpdateNetworkRequest,
    UpdateTagRequest, UpdateUserGroupRequest, UpdateUserRequest,
};

/// All write operations against the controller.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Networks ─────────────────────────────────────────────────────
    CreateNetwork(CreateNetworkRequest),
    UpdateNetwork {
        network: String,
        update: UpdateNetworkRequest,
    },
    DeleteNetwork {
        network: String,
    },

    // ── Hosts & nodes ────────────────────────────────────────────────
    UpdateHost {
        id: EntityId,
        update: UpdateHostRequest,
    },
    DeleteHost {
        id: EntityId,
    },
    AddHostToNetwork {
        host: EntityId,
        network: String,
    },
    RemoveHostFromNetwork {
        host: EntityId,
        network: String,
    },
    DeleteNode {
        network: String,
        id: EntityId,
    },

    // ── Relays ───────────────────────────────────────────────────────
    CreateRelay {
        network: String,
        relay: NodeTarget,
        relayed: Vec<EntityId>,
    },
    /// Replace the relay's relayed set in one write.
    UpdateRelayedNodes {
        network: String,
        relay: EntityId,
        relayed: Vec<EntityId>,
    },
    ReassignRelayedNode {
        network: String,
        node: EntityId,
        from: EntityId,
        to: EntityId,
    },
    DeleteRelay {
        network: String,
        relay: EntityId,
    },

    // ── Egress ───────────────────────────────────────────────────────
    CreateEgress {
        network: String,
        node: NodeTarget,
        request: CreateEgressRequest,
    },
    /// Delete-then-recreate with new ranges; empty removes egress.
    UpdateEgressRanges {
        network: String,
        node: EntityId,
        ranges: Vec<String>,
    },
    DeleteEgress {
        network: String,
        node: EntityId,
    },

    // ── Ingress (remote access) ──────────────────────────────────────
    CreateIngress {
        network: String,
        node: NodeTarget,
        request: CreateIngressRequest,
    },
    DeleteIngress {
        network: String,
        node: EntityId,
    },

    // ── Internet gateways ────────────────────────────────────────────
    CreateInternetGateway {
        network: String,
        node: NodeTarget,
        clients: Vec<EntityId>,
    },
    UpdateInternetGateway {
        network: String,
        node: EntityId,
        clients: Vec<EntityId>,
    },
    DeleteInternetGateway {
        network: String,
        node: EntityId,
    },

    // ── External clients ─────────────────────────────────────────────
    CreateExtClient {
        network: String,
        request: CreateExtClientRequest,
    },
    UpdateExtClient {
        network: String,
        client_id: String,
        update: UpdateExtClientRequest,
    },
    SetExtClientEnabled {
        network: String,
        client_id: String,
        enabled: bool,
    },
    DeleteExtClient {
        network: String,
        client_id: String,
    },

    // ── Users, groups ────────────────────────────────────────────────
    CreateUser(CreateUserRequest),
    UpdateUser {
        username: String,
        update: UpdateUserRequest,
    },
    DeleteUser {
        username: String,
    },
    CreateUserGroup(CreateUserGroupRequest),
    UpdateUserGroup {
        id: EntityId,
        update: UpdateUserGroupRequest,
    },
    DeleteUserGroup {
        id: EntityId,
    },

    // ── ACL ──────────────────────────────────────────────────────────
    CreateAcl(CreateAclRequest),
    UpdateAcl {
        id: EntityId,
        update: UpdateAclRequest,
    },
    DeleteAcl {
        id: EntityId,
    },

    // ── Tags ─────────────────────────────────────────────────────────
    CreateTag(CreateTagRequest),
    UpdateTag {
        id: EntityId,
        update: UpdateTagRequest,
    },
    DeleteTag {
        id: EntityId,
    },

    // ── DNS ──────────────────────────────────────────────────────────
    CreateDnsEntry(CreateDnsEntryRequest),
    DeleteDnsEntry {
        network: String,
        name: String,
    },

    // ── Enrollment keys ──────────────────────────────────────────────
    CreateEnrollmentKey(CreateEnrollmentKeyRequest),
    UpdateEnrollmentKey {
        id: EntityId,
        update: UpdateEnrollmentKeyRequest,
    },
    DeleteEnrollmentKey {
        id: EntityId,
    },
}

impl Command {
    /// Local checks that need no server state.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::CreateNetwork(req) => req.validate(),
            Self::UpdateNetwork { update, .. } => update.validate(),
            Self::UpdateHost { update, .. } => update.validate(),
            Self::CreateEgress { request, .. } => request.validate(),
            Self::UpdateEgressRanges { ranges, .. } => {
                requests::parse_ranges(ranges).map(|_| ())
            }
            Self::CreateIngress { request, .. } => request.validate(),
            Self::CreateExtClient { request, .. } => request.validate(),
            Self::UpdateExtClient { update, .. } => update.validate(),
            Self::CreateUser(req) => req.validate(),
            Self::UpdateUser { update, .. } => update.validate(),
            Self::CreateUserGroup(req) => req.validate(),
            Self::CreateAcl(req) => req.validate(),
            Self::CreateTag(req) => req.validate(),
            Self::UpdateTag { update, .. } => update.validate(),
            Self::CreateDnsEntry(req) => req.validate(),
            Self::CreateEnrollmentKey(req) => req.validate(),
            Self::ReassignRelayedNode { from, to, .. } if from == to => {
                let mut errors = ValidationErrors::new();
                errors.push("to", "must differ from the current relay");
                Err(errors)
            }
            _ => Ok(()),
        }
    }

    /// Short label for progress output.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateNetwork(req) => format!("create network {}", req.name),
            Self::AddHostToNetwork { host, network } => {
                format!("add host {host} to network {network}")
            }
            Self::CreateIngress { network, node, .. } => {
                format!("make {node} a remote-access gateway in {network}")
            }
            Self::CreateEgress { network, node, .. } => {
                format!("make {node} an egress gateway in {network}")
            }
            Self::CreateInternetGateway { network, node, .. } => {
                format!("make {node} an internet gateway in {network}")
            }
            Self::CreateEnrollmentKey(req) => {
                format!("create enrollment key for {}", req.networks.join(", "))
            }
            other => format!("{other:?}")
                .split([' ', '(', '{'])
                .next()
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

/// Result of a command execution.
#[derive(Debug)]
pub enum CommandResult {
    Ok,
    Network(Network),
    Host(Host),
    Node(Node),
    /// Every node the command touched (relay moves touch two).
    Nodes(Vec<Node>),
    ExtClient(ExtClient),
    User(User),
    UserGroup(UserGroup),
    AclRule(AclRule),
    Tag(Tag),
    DnsEntry(DnsEntry),
    EnrollmentKey(EnrollmentKey),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassign_to_same_relay_is_rejected() {
        let cmd = Command::ReassignRelayedNode {
            network: "office".into(),
            node: EntityId::from("n1"),
            from: EntityId::from("r1"),
            to: EntityId::from("r1"),
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn describe_falls_back_to_variant_name() {
        let cmd = Command::DeleteTag {
            id: EntityId::from("office.web"),
        };
        assert_eq!(cmd.describe(), "DeleteTag");
    }
}
