// ── Supporting resource types ──
//
// Tags, DNS entries, enrollment keys and server info: smaller records
// that hang off networks or the server itself.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// `{network}.{name}` on the wire.
    pub id: EntityId,
    pub name: String,
    pub network: String,
    pub tagged_nodes: Vec<EntityId>,
    pub used_by_count: u32,
    pub created_by: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsEntry {
    pub name: String,
    pub network: String,
    pub address: Option<Ipv4Addr>,
    pub address6: Option<Ipv6Addr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum EnrollmentKeyType {
    #[default]
    Undefined,
    TimeExpiration,
    Uses,
    Unlimited,
}

impl EnrollmentKeyType {
    pub fn from_wire(raw: i32) -> Self {
        match raw {
            1 => Self::TimeExpiration,
            2 => Self::Uses,
            3 => Self::Unlimited,
            _ => Self::Undefined,
        }
    }

    pub fn wire(self) -> i32 {
        match self {
            Self::Undefined => 0,
            Self::TimeExpiration => 1,
            Self::Uses => 2,
            Self::Unlimited => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentKey {
    pub id: EntityId,
    /// The token agents pass to `join`.
    pub token: String,
    pub networks: Vec<String>,
    pub tags: Vec<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub uses_remaining: u32,
    pub unlimited: bool,
    pub key_type: EnrollmentKeyType,
}

/// Server build and session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    pub is_pro: bool,
    /// Session token lifetime in nanoseconds.
    pub session_validity_ns: i64,
    pub default_domain: String,
    pub db_connected: Option<bool>,
    pub broker_connected: Option<bool>,
}
