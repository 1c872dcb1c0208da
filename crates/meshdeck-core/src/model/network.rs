// ── Network domain types ──

use chrono::{DateTime, Utc};
use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;

/// What peers may do when no explicit policy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DefaultAclPolicy {
    #[default]
    Allow,
    Deny,
}

/// Pro-tier per-network access settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProSettings {
    pub default_access_level: i32,
    pub default_user_node_limit: i32,
    pub default_user_client_limit: i32,
    pub allowed_users: Vec<String>,
    pub allowed_groups: Vec<String>,
}

/// An overlay network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: EntityId,
    /// The network id (`netid`), which is also its display name.
    pub name: String,
    pub ipv4_range: Option<Ipv4Net>,
    pub ipv6_range: Option<Ipv6Net>,
    pub default_acl: DefaultAclPolicy,
    pub nameservers: Vec<String>,
    pub default_keepalive: u32,
    pub default_mtu: u32,
    pub nodes_last_modified: Option<DateTime<Utc>>,
    pub network_last_modified: Option<DateTime<Utc>>,
    pub pro_settings: Option<NetworkProSettings>,
}
