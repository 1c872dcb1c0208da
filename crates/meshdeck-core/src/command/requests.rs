// ── Typed request structs for Command payloads ──
//
// Built from CLI flags or a `--from-file` JSON document, validated
// locally, then translated to wire records by the controller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::model::{
    AclMember, AclMemberKind, DefaultAclPolicy, EntityId, PlatformRole, PolicyType,
    TrafficDirection,
};
use crate::validate::{self, ValidationErrors};

pub const MIN_PASSWORD_LEN: usize = 5;

fn default_true() -> bool {
    true
}

// ── Network ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNetworkRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_range: Option<String>,
    #[serde(default)]
    pub default_acl: DefaultAclPolicy,
    #[serde(default)]
    pub nameservers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_keepalive: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mtu: Option<u32>,
}

impl CreateNetworkRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate::network_name("name", &self.name));
        if let Err(range_errors) =
            validate::address_ranges(self.ipv4_range.as_deref(), self.ipv6_range.as_deref())
        {
            for e in range_errors.errors() {
                errors.push(e.field.clone(), e.reason.clone());
            }
        }
        for ns in &self.nameservers {
            if ns.parse::<std::net::IpAddr>().is_err() {
                errors.push("nameservers", format!("'{ns}' is not an IP address"));
            }
        }
        errors.into_result()
    }
}

/// Overrides applied on top of the current network record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNetworkRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_acl: Option<DefaultAclPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_keepalive: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mtu: Option<u32>,
}

impl UpdateNetworkRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(v4) = self.ipv4_range.as_deref().filter(|s| !s.is_empty()) {
            errors.check(validate::ipv4_cidr("ipv4_range", v4).map(|_| ()));
        }
        if let Some(v6) = self.ipv6_range.as_deref().filter(|s| !s.is_empty()) {
            errors.check(validate::ipv6_cidr("ipv6_range", v6).map(|_| ()));
        }
        errors.into_result()
    }
}

// ── Host ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateHostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_keepalive: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_ip: Option<String>,
}

impl UpdateHostRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check(validate::required("name", name));
        }
        if let Some(port) = self.listen_port {
            errors.check(validate::port("listen_port", port));
        }
        if let Some(mtu) = self.mtu {
            if !(576..=9000).contains(&mtu) {
                errors.push("mtu", "must be between 576 and 9000");
            }
        }
        if let Some(ip) = &self.endpoint_ip {
            if ip.parse::<std::net::IpAddr>().is_err() {
                errors.push("endpoint_ip", format!("'{ip}' is not an IP address"));
            }
        }
        errors.into_result()
    }
}

// ── Node targets ───────────────────────────────────────────────────

/// Which node a gateway or relay command acts on: a node id, or the node
/// a host has in the command's network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTarget {
    Node(EntityId),
    Host(EntityId),
}

impl std::fmt::Display for NodeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node {id}"),
            Self::Host(id) => write!(f, "host {id}"),
        }
    }
}

// ── Gateways ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEgressRequest {
    pub ranges: Vec<String>,
    #[serde(default = "default_true")]
    pub nat: bool,
}

impl CreateEgressRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.ranges.is_empty() {
            errors.push("ranges", "at least one range is required");
        }
        errors.check(validate::cidr_list("ranges", &self.ranges).map(|_| ()));
        errors.into_result()
    }

    pub fn parsed_ranges(&self) -> Vec<IpNet> {
        self.ranges
            .iter()
            .filter_map(|r| r.trim().parse().ok())
            .collect()
    }
}

/// Ranges for an egress replacement; empty removes egress entirely.
pub fn parse_ranges(ranges: &[String]) -> Result<Vec<IpNet>, ValidationErrors> {
    validate::cidr_list("ranges", ranges).map_err(|e| {
        let mut errors = ValidationErrors::new();
        errors.check(Err(e));
        errors
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIngressRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,
}

impl CreateIngressRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(dns) = self.dns.as_deref().filter(|s| !s.is_empty()) {
            if dns.parse::<std::net::IpAddr>().is_err() {
                errors.push("dns", format!("'{dns}' is not an IP address"));
            }
        }
        errors.into_result()
    }
}

// ── External clients ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExtClientRequest {
    /// Remote-access gateway node the client attaches to.
    pub gateway: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,
    #[serde(default)]
    pub extra_allowed_ips: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CreateExtClientRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(id) = &self.client_id {
            errors.check(validate::client_id("client_id", id));
        }
        errors.check(validate::cidr_list("extra_allowed_ips", &self.extra_allowed_ips).map(|_| ()));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExtClientRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_allowed_ips: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl UpdateExtClientRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(id) = &self.new_client_id {
            errors.check(validate::client_id("new_client_id", id));
        }
        if let Some(ips) = &self.extra_allowed_ips {
            errors.check(validate::cidr_list("extra_allowed_ips", ips).map(|_| ()));
        }
        errors.into_result()
    }
}

// ── Users ──────────────────────────────────────────────────────────

fn platform_user() -> PlatformRole {
    PlatformRole::PlatformUser
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default = "platform_user")]
    pub platform_role: PlatformRole,
    /// network → role ids
    #[serde(default)]
    pub network_roles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate::username("username", &self.username));
        if self.password.len() < MIN_PASSWORD_LEN {
            errors.push(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        if self.platform_role == PlatformRole::SuperAdmin {
            errors.push("platform_role", "a super admin cannot be created here");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_role: Option<PlatformRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_roles: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self
            .password
            .as_ref()
            .is_some_and(|p| p.len() < MIN_PASSWORD_LEN)
        {
            errors.push(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub network_roles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub members: Vec<String>,
}

impl CreateUserGroupRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate::label("name", &self.name));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserGroupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_roles: Option<BTreeMap<String, Vec<String>>>,
}

// ── ACL ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAclRequest {
    pub network: String,
    pub name: String,
    pub policy_type: PolicyType,
    pub sources: Vec<AclMember>,
    pub destinations: Vec<AclMember>,
    #[serde(default)]
    pub direction: TrafficDirection,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
}

/// Member kinds allowed on each side of a policy.
fn check_members(
    errors: &mut ValidationErrors,
    field: &str,
    members: &[AclMember],
    allowed: &[AclMemberKind],
) {
    if members.is_empty() {
        errors.push(field, "at least one member is required");
    }
    for m in members {
        if !allowed.contains(&m.kind) {
            errors.push(field, format!("'{m}' is not allowed in this policy type"));
        }
    }
}

fn acl_member_kinds(policy_type: PolicyType) -> (&'static [AclMemberKind], &'static [AclMemberKind]) {
    const DEVICE: &[AclMemberKind] = &[AclMemberKind::Tag, AclMemberKind::Device];
    const USER_SRC: &[AclMemberKind] = &[AclMemberKind::User, AclMemberKind::UserGroup];
    match policy_type {
        PolicyType::User => (USER_SRC, DEVICE),
        PolicyType::Device => (DEVICE, DEVICE),
    }
}

impl CreateAclRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate::network_name("network", &self.network));
        errors.check(validate::required("name", &self.name));
        let (src, dst) = acl_member_kinds(self.policy_type);
        check_members(&mut errors, "sources", &self.sources, src);
        check_members(&mut errors, "destinations", &self.destinations, dst);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAclRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<AclMember>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Vec<AclMember>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<TrafficDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateAclRequest {
    /// Member kinds depend on the existing rule's policy type.
    pub fn validate_for(&self, policy_type: PolicyType) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check(validate::required("name", name));
        }
        let (src, dst) = acl_member_kinds(policy_type);
        if let Some(sources) = &self.sources {
            check_members(&mut errors, "sources", sources, src);
        }
        if let Some(destinations) = &self.destinations {
            check_members(&mut errors, "destinations", destinations, dst);
        }
        errors.into_result()
    }
}

// ── Tags ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagRequest {
    pub network: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<EntityId>,
}

impl CreateTagRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate::network_name("network", &self.network));
        errors.check(validate::label("name", &self.name));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTagRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<EntityId>>,
}

impl UpdateTagRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.new_name {
            errors.check(validate::label("new_name", name));
        }
        errors.into_result()
    }
}

// ── DNS ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDnsEntryRequest {
    pub network: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address6: Option<String>,
}

impl CreateDnsEntryRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate::network_name("network", &self.network));
        errors.check(validate::dns_name("name", &self.name));
        match (&self.address, &self.address6) {
            (None, None) => errors.push("address", "an IPv4 or IPv6 address is required"),
            (v4, v6) => {
                if v4
                    .as_ref()
                    .is_some_and(|a| a.parse::<std::net::Ipv4Addr>().is_err())
                {
                    errors.push("address", "must be an IPv4 address");
                }
                if v6
                    .as_ref()
                    .is_some_and(|a| a.parse::<std::net::Ipv6Addr>().is_err())
                {
                    errors.push("address6", "must be an IPv6 address");
                }
            }
        }
        errors.into_result()
    }
}

// ── Enrollment keys ────────────────────────────────────────────────

/// Exactly one of `expiration`, `uses` or `unlimited` bounds a key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEnrollmentKeyRequest {
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<u32>,
    #[serde(default)]
    pub unlimited: bool,
}

impl CreateEnrollmentKeyRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let modes = usize::from(self.expiration.is_some())
            + usize::from(self.uses.is_some())
            + usize::from(self.unlimited);
        if modes != 1 {
            errors.push(
                "type",
                "choose exactly one of expiration, uses or unlimited",
            );
        }
        if self.uses == Some(0) {
            errors.push("uses", "must be at least 1");
        }
        if self.expiration.is_some_and(|e| e <= Utc::now()) {
            errors.push("expiration", "must be in the future");
        }
        for net in &self.networks {
            errors.check(validate::network_name("networks", net));
        }
        for tag in &self.tags {
            errors.check(validate::label("tags", tag));
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEnrollmentKeyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(err: &ValidationErrors) -> Vec<&str> {
        err.errors().iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn network_request_collects_every_field_error() {
        let req = CreateNetworkRequest {
            name: "Bad Name".into(),
            ipv4_range: None,
            ipv6_range: None,
            default_acl: DefaultAclPolicy::Allow,
            nameservers: vec!["dns.example".into()],
            default_keepalive: None,
            default_mtu: None,
        };
        let err = req.validate().unwrap_err();
        assert_eq!(fields(&err), vec!["name", "ipv4_range", "nameservers"]);
    }

    #[test]
    fn network_request_from_json_defaults() {
        let req: CreateNetworkRequest =
            serde_json::from_str(r#"{"name":"office","ipv4_range":"10.101.0.0/16"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.default_acl, DefaultAclPolicy::Allow);
    }

    #[test]
    fn user_request_checks_password_and_email() {
        let req = CreateUserRequest {
            username: "ops@example".into(),
            password: "abc".into(),
            platform_role: PlatformRole::Admin,
            network_roles: BTreeMap::new(),
            groups: Vec::new(),
        };
        let err = req.validate().unwrap_err();
        assert_eq!(fields(&err), vec!["username", "password"]);
    }

    #[test]
    fn user_policy_sources_must_be_users() {
        let req = CreateAclRequest {
            network: "office".into(),
            name: "ops-to-web".into(),
            policy_type: PolicyType::User,
            sources: vec!["tag:office.web".parse().unwrap()],
            destinations: vec!["tag:*".parse().unwrap()],
            direction: TrafficDirection::Bi,
            enabled: true,
            description: String::new(),
        };
        let err = req.validate().unwrap_err();
        assert_eq!(fields(&err), vec!["sources"]);

        let ok = CreateAclRequest {
            sources: vec!["user-group:ops".parse().unwrap()],
            ..req
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn enrollment_key_needs_exactly_one_mode() {
        let none = CreateEnrollmentKeyRequest::default();
        assert_eq!(fields(&none.validate().unwrap_err()), vec!["type"]);

        let two = CreateEnrollmentKeyRequest {
            uses: Some(3),
            unlimited: true,
            ..CreateEnrollmentKeyRequest::default()
        };
        assert!(two.validate().is_err());

        let ok = CreateEnrollmentKeyRequest {
            networks: vec!["office".into()],
            uses: Some(3),
            ..CreateEnrollmentKeyRequest::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn dns_entry_needs_an_address() {
        let req = CreateDnsEntryRequest {
            network: "office".into(),
            name: "nas".into(),
            address: None,
            address6: None,
        };
        assert_eq!(fields(&req.validate().unwrap_err()), vec!["address"]);
    }

    #[test]
    fn egress_request_rejects_bad_ranges() {
        let req = CreateEgressRequest {
            ranges: vec!["10.0.0.0/8".into(), "nope".into()],
            nat: true,
        };
        assert!(req.validate().is_err());
        assert!(parse_ranges(&[]).unwrap().is_empty());
    }
}
