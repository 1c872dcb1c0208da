// ── Node domain types ──
//
// A node is one host's membership in one network. Role flags (relay,
// gateways) live on the node, not the host.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;
use super::host::{Host, NatType};

/// Health as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NodeStatus {
    Online,
    Offline,
    Warning,
    Error,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: EntityId,
    pub host_id: EntityId,
    pub network: String,
    pub address: Option<Ipv4Net>,
    pub address6: Option<Ipv6Net>,
    pub connected: bool,
    pub status: NodeStatus,
    pub last_check_in: Option<DateTime<Utc>>,

    // Relay
    pub is_relay: bool,
    pub relayed_nodes: Vec<EntityId>,
    pub is_relayed: bool,
    pub relayed_by: Option<EntityId>,

    // Egress
    pub is_egress_gateway: bool,
    pub egress_ranges: Vec<IpNet>,
    pub egress_nat: bool,

    // Ingress (remote access)
    pub is_ingress_gateway: bool,
    pub ingress_dns: Option<String>,

    // Internet gateway
    pub is_internet_gateway: bool,
    pub internet_gateway_clients: Vec<EntityId>,
    pub internet_gateway_id: Option<EntityId>,

    pub tags: Vec<String>,
    pub pending_delete: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A node joined with its host, for display.
#[derive(Debug, Clone)]
pub struct ExtendedNode {
    pub node: Arc<Node>,
    pub host: Option<Arc<Host>>,
}

impl ExtendedNode {
    /// Host name, or the node id when the host is not (yet) known.
    pub fn name(&self) -> String {
        self.host
            .as_ref()
            .map_or_else(|| self.node.id.to_string(), |h| h.name.clone())
    }

    pub fn os(&self) -> &str {
        self.host.as_ref().map_or("", |h| h.os.as_str())
    }

    pub fn version(&self) -> &str {
        self.host.as_ref().map_or("", |h| h.version.as_str())
    }

    pub fn nat_type(&self) -> Option<NatType> {
        self.host.as_ref().and_then(|h| h.nat_type)
    }

    pub fn is_linux(&self) -> bool {
        self.host.as_ref().is_some_and(|h| h.is_linux())
    }

    /// `203.0.113.10:51821`, or empty when the host has no public endpoint.
    pub fn endpoint(&self) -> String {
        match self.host.as_deref() {
            Some(Host {
                endpoint_ip: Some(ip),
                listen_port,
                ..
            }) => format!("{ip}:{listen_port}"),
            _ => String::new(),
        }
    }
}
