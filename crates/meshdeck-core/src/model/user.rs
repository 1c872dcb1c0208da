// ── User, group and role domain types ──

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;

/// How a user signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthType {
    #[default]
    Basic,
    Oauth,
}

/// Built-in platform roles. Custom roles show up as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlatformRole {
    SuperAdmin,
    Admin,
    PlatformUser,
    ServiceUser,
    Other(String),
}

impl PlatformRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SuperAdmin => "super-admin",
            Self::Admin => "admin",
            Self::PlatformUser => "platform-user",
            Self::ServiceUser => "service-user",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for PlatformRole {
    fn from(raw: &str) -> Self {
        match raw {
            "super-admin" => Self::SuperAdmin,
            "admin" => Self::Admin,
            "platform-user" => Self::PlatformUser,
            "service-user" => Self::ServiceUser,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for PlatformRole {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<PlatformRole> for String {
    fn from(role: PlatformRole) -> Self {
        role.as_str().to_owned()
    }
}

impl std::fmt::Display for PlatformRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub platform_role: PlatformRole,
    pub is_super_admin: bool,
    pub is_admin: bool,
    pub auth_type: AuthType,
    /// network → role ids granted in it
    pub network_roles: BTreeMap<String, Vec<String>>,
    pub groups: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: EntityId,
    pub name: String,
    pub network_roles: BTreeMap<String, Vec<String>>,
    pub description: String,
}

/// A role template. Listed read-only; the server owns the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: EntityId,
    pub name: String,
    /// Empty for platform roles.
    pub network: Option<String>,
    pub is_default: bool,
    pub full_access: bool,
    pub deny_dashboard_access: bool,
    pub description: String,
}
