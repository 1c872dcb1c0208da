// ── Access-control domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;

/// Whether a policy governs users (remote access) or devices (node ↔ node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(ascii_case_insensitive)]
pub enum PolicyType {
    #[strum(to_string = "user", serialize = "user-policy")]
    User,
    #[strum(to_string = "device", serialize = "device-policy")]
    Device,
}

impl PolicyType {
    pub fn wire(self) -> &'static str {
        match self {
            Self::User => "user-policy",
            Self::Device => "device-policy",
        }
    }
}

/// Kind of member in an ACL source/destination set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum AclMemberKind {
    User,
    UserGroup,
    Tag,
    Device,
}

/// One member of a source or destination set; `value` may be `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclMember {
    pub kind: AclMemberKind,
    pub value: String,
}

impl AclMember {
    pub const WILDCARD: &'static str = "*";

    pub fn is_wildcard(&self) -> bool {
        self.value == Self::WILDCARD
    }
}

impl std::fmt::Display for AclMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

impl std::str::FromStr for AclMember {
    type Err = String;

    /// Parse `kind:value`, e.g. `tag:office.web` or `user-group:*`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected kind:value, got '{s}'"))?;
        let kind: AclMemberKind = kind
            .parse()
            .map_err(|_| format!("unknown member kind '{kind}' (user, user-group, tag, device)"))?;
        if value.is_empty() {
            return Err(format!("empty value in '{s}'"));
        }
        Ok(Self {
            kind,
            value: value.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TrafficDirection {
    Uni,
    #[default]
    Bi,
}

impl TrafficDirection {
    pub fn wire(self) -> u8 {
        match self {
            Self::Uni => 0,
            Self::Bi => 1,
        }
    }

    pub fn from_wire(raw: u8) -> Self {
        if raw == 0 { Self::Uni } else { Self::Bi }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclRule {
    pub id: EntityId,
    pub name: String,
    pub network: String,
    pub policy_type: PolicyType,
    pub enabled: bool,
    pub is_default: bool,
    pub sources: Vec<AclMember>,
    pub destinations: Vec<AclMember>,
    pub direction: TrafficDirection,
    pub description: String,
    pub created_by: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn member_parses_kind_and_value() {
        let m: AclMember = "user-group:ops".parse().unwrap();
        assert_eq!(m.kind, AclMemberKind::UserGroup);
        assert_eq!(m.value, "ops");
        assert!(!m.is_wildcard());
    }

    #[test]
    fn member_wildcard() {
        let m: AclMember = "tag:*".parse().unwrap();
        assert!(m.is_wildcard());
        assert_eq!(m.to_string(), "tag:*");
    }

    #[test]
    fn member_rejects_unknown_kind() {
        assert!("host:abc".parse::<AclMember>().is_err());
        assert!("tag".parse::<AclMember>().is_err());
    }

    #[test]
    fn policy_type_accepts_short_and_wire_forms() {
        assert_eq!("user".parse::<PolicyType>().unwrap(), PolicyType::User);
        assert_eq!(
            "device-policy".parse::<PolicyType>().unwrap(),
            PolicyType::Device
        );
    }
}
