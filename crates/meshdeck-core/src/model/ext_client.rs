// ── External client domain types ──

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;

/// A remote-access client (phone, laptop) attached to an ingress gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtClient {
    pub id: EntityId,
    /// The client id as shown to users; also the config file name.
    pub name: String,
    pub network: String,
    pub gateway_id: EntityId,
    pub gateway_endpoint: String,
    pub address: Option<Ipv4Net>,
    pub address6: Option<Ipv6Net>,
    pub public_key: String,
    pub dns: Option<String>,
    pub extra_allowed_ips: Vec<IpNet>,
    pub enabled: bool,
    pub owner: Option<String>,
    pub tags: Vec<String>,
}
