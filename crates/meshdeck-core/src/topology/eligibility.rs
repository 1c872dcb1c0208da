// ── Role eligibility ──
//
// Whether a node may take a topology role. Every relay and gateway
// command and every candidate picker asks this module; nothing else
// encodes these rules.

use std::fmt;

use crate::model::{EntityId, ExtendedNode, Node};

/// Why a node cannot be picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    IsRelay,
    AlreadyRelayed { relay: EntityId },
    IsRelayed,
    IsInternetGateway,
    AttachedToOtherGateway { gateway: EntityId },
    AlreadyIngress,
    AlreadyEgress,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsRelay => f.write_str("node is itself a relay"),
            Self::AlreadyRelayed { relay } => write!(f, "already relayed by {relay}"),
            Self::IsRelayed => f.write_str("node is relayed"),
            Self::IsInternetGateway => f.write_str("node is an internet gateway"),
            Self::AttachedToOtherGateway { gateway } => {
                write!(f, "attached to internet gateway {gateway}")
            }
            Self::AlreadyIngress => f.write_str("already a remote-access gateway"),
            Self::AlreadyEgress => f.write_str("already an egress gateway"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignability {
    Selectable,
    Blocked { reason: BlockReason },
}

impl Assignability {
    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Selectable)
    }

    pub fn reason(&self) -> Option<&BlockReason> {
        match self {
            Self::Selectable => None,
            Self::Blocked { reason } => Some(reason),
        }
    }

    fn blocked(reason: BlockReason) -> Self {
        Self::Blocked { reason }
    }
}

// ── Rules ────────────────────────────────────────────────────────────

/// As a node relayed by a relay. `editing_relay` is the relay whose
/// set is being edited; its current members stay selectable.
pub fn as_relayed_node(node: &Node, editing_relay: Option<&EntityId>) -> Assignability {
    if node.is_relay {
        return Assignability::blocked(BlockReason::IsRelay);
    }
    match (&node.relayed_by, editing_relay) {
        (Some(by), Some(editing)) if by == editing => Assignability::Selectable,
        (Some(by), _) => Assignability::blocked(BlockReason::AlreadyRelayed { relay: by.clone() }),
        (None, _) if node.is_relayed => Assignability::blocked(BlockReason::IsRelayed),
        (None, _) => Assignability::Selectable,
    }
}

/// As a client of an internet gateway. `gateway` is the gateway being
/// edited; nodes already attached to it stay selectable.
pub fn as_internet_gateway_client(node: &Node, gateway: Option<&EntityId>) -> Assignability {
    if node.is_internet_gateway {
        return Assignability::blocked(BlockReason::IsInternetGateway);
    }
    match (&node.internet_gateway_id, gateway) {
        (Some(current), Some(editing)) if current == editing => Assignability::Selectable,
        (Some(current), _) => Assignability::blocked(BlockReason::AttachedToOtherGateway {
            gateway: current.clone(),
        }),
        (None, _) => Assignability::Selectable,
    }
}

pub fn as_internet_gateway(node: &Node) -> Assignability {
    if node.is_internet_gateway {
        Assignability::blocked(BlockReason::IsInternetGateway)
    } else {
        Assignability::Selectable
    }
}

pub fn as_ingress_gateway(node: &Node) -> Assignability {
    if node.is_ingress_gateway {
        Assignability::blocked(BlockReason::AlreadyIngress)
    } else {
        Assignability::Selectable
    }
}

pub fn as_egress_gateway(node: &Node) -> Assignability {
    if node.is_egress_gateway {
        Assignability::blocked(BlockReason::AlreadyEgress)
    } else {
        Assignability::Selectable
    }
}

/// A node counts as relayed when either the flag or `relayed_by` is set.
pub fn as_relay(node: &Node) -> Assignability {
    if node.is_relayed || node.relayed_by.is_some() {
        Assignability::blocked(BlockReason::IsRelayed)
    } else {
        Assignability::Selectable
    }
}

// ── Candidate lists ──────────────────────────────────────────────────

/// The role a candidate list is being built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Relay,
    RelayedNode { editing_relay: Option<EntityId> },
    InternetGateway,
    InternetGatewayClient { gateway: Option<EntityId> },
    IngressGateway,
    EgressGateway,
}

impl Role {
    pub fn check(&self, node: &Node) -> Assignability {
        match self {
            Self::Relay => as_relay(node),
            Self::RelayedNode { editing_relay } => as_relayed_node(node, editing_relay.as_ref()),
            Self::InternetGateway => as_internet_gateway(node),
            Self::InternetGatewayClient { gateway } => {
                as_internet_gateway_client(node, gateway.as_ref())
            }
            Self::IngressGateway => as_ingress_gateway(node),
            Self::EgressGateway => as_egress_gateway(node),
        }
    }

    /// Gateway and relay roles run on Linux hosts only.
    pub fn requires_linux(&self) -> bool {
        matches!(
            self,
            Self::Relay | Self::InternetGateway | Self::IngressGateway | Self::EgressGateway
        )
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: ExtendedNode,
    pub assignability: Assignability,
}

/// Candidates for `role`, for display in a picker.
///
/// Non-Linux hosts are left out of gateway and relay lists. Blocked nodes
/// follow selectable ones; order within each group is preserved.
pub fn candidates(nodes: Vec<ExtendedNode>, role: &Role) -> Vec<Candidate> {
    let mut list: Vec<Candidate> = nodes
        .into_iter()
        .filter(|n| !role.requires_linux() || n.is_linux())
        .map(|node| Candidate {
            assignability: role.check(&node.node),
            node,
        })
        .collect();
    list.sort_by_key(|c| !c.assignability.is_selectable());
    list
}
