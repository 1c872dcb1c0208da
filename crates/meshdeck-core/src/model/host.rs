// ── Host domain types ──

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::{EntityId, MacAddress};

/// NAT classification reported by the agent's STUN probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NatType {
    Public,
    Asymmetric,
    Symmetric,
}

impl NatType {
    /// Whether peers have to traverse NAT to reach this host.
    pub fn is_natted(self) -> bool {
        matches!(self, Self::Asymmetric | Self::Symmetric)
    }
}

/// A machine running the network agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: EntityId,
    pub name: String,
    pub version: String,
    pub os: String,
    pub endpoint_ip: Option<Ipv4Addr>,
    pub endpoint_ipv6: Option<Ipv6Addr>,
    pub listen_port: u16,
    pub public_key: String,
    pub mtu: u32,
    pub persistent_keepalive: u32,
    pub nat_type: Option<NatType>,
    pub is_default: bool,
    pub is_static: bool,
    /// Node ids, one per joined network.
    pub node_ids: Vec<EntityId>,
    pub mac: Option<MacAddress>,
}

impl Host {
    pub fn is_linux(&self) -> bool {
        self.os.eq_ignore_ascii_case("linux")
    }
}
