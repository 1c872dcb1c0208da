// ── API-to-domain type conversions ──
//
// Bridges raw `meshdeck_api::types` records into canonical
// `meshdeck_core::model` types. Each `From` impl parses strings into
// strong types and turns the server's "empty means absent" convention
// into `Option`s.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Datelike, Utc};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde_json::Value;

use meshdeck_api::types::{
    AclPolicyTag, AclResponse, DnsEntryResponse, EnrollmentKeyResponse, ExtClientResponse,
    HostResponse, NetworkResponse, NodeResponse, ServerConfigResponse, TagResponse,
    UserGroupResponse, UserResponse, UserRoleResponse,
};

use crate::model::{
    AclMember, AclMemberKind, AclRule, AuthType, DefaultAclPolicy, DnsEntry, EnrollmentKey,
    EnrollmentKeyType, EntityId, ExtClient, Host, MacAddress, Network, NetworkProSettings, Node,
    NodeStatus, PlatformRole, PolicyType, ServerInfo, Tag, TrafficDirection, User, UserGroup,
    UserRole,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Convert epoch seconds to a timestamp; `0` means unset.
fn epoch_to_datetime(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch <= 0 {
        None
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

/// Parse an RFC 3339 timestamp. The Go zero time (`0001-01-01T00:00:00Z`)
/// and empty strings mean unset.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|dt| dt.year() > 1)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Node and client addresses arrive as `10.101.0.3/16` or a bare `10.101.0.3`.
fn parse_v4_addr(raw: &str) -> Option<Ipv4Net> {
    raw.parse::<Ipv4Net>()
        .ok()
        .or_else(|| raw.parse::<Ipv4Addr>().ok().map(Ipv4Net::from))
}

fn parse_v6_addr(raw: &str) -> Option<Ipv6Net> {
    raw.parse::<Ipv6Net>()
        .ok()
        .or_else(|| raw.parse::<Ipv6Addr>().ok().map(Ipv6Net::from))
}

fn parse_nets(raw: &[String]) -> Vec<IpNet> {
    raw.iter().filter_map(|s| s.trim().parse().ok()).collect()
}

fn ids(raw: &[String]) -> Vec<EntityId> {
    raw.iter()
        .filter(|s| !s.is_empty())
        .map(|s| EntityId::from(s.as_str()))
        .collect()
}

/// `{ "a": {}, "b": {} }` → `["a", "b"]`
fn map_keys(raw: &BTreeMap<String, Value>) -> Vec<String> {
    raw.keys().cloned().collect()
}

fn role_map(raw: &BTreeMap<String, BTreeMap<String, Value>>) -> BTreeMap<String, Vec<String>> {
    raw.iter()
        .map(|(net, roles)| (net.clone(), map_keys(roles)))
        .collect()
}

fn u32_or_zero(raw: i32) -> u32 {
    u32::try_from(raw).unwrap_or(0)
}

// ━━ Network ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl From<NetworkResponse> for Network {
    fn from(n: NetworkResponse) -> Self {
        let default_acl = if n.defaultacl.eq_ignore_ascii_case("no") {
            DefaultAclPolicy::Deny
        } else {
            DefaultAclPolicy::Allow
        };

        Network {
            id: EntityId::Name(n.netid.clone()),
            ipv4_range: n.addressrange.parse().ok(),
            ipv6_range: n.addressrange6.parse().ok(),
            default_acl,
            nameservers: n.nameservers.into_iter().filter(|s| !s.is_empty()).collect(),
            default_keepalive: u32_or_zero(n.defaultkeepalive),
            default_mtu: u32_or_zero(n.defaultmtu),
            nodes_last_modified: epoch_to_datetime(n.nodeslastmodified),
            network_last_modified: epoch_to_datetime(n.networklastmodified),
            pro_settings: n.prosettings.map(|p| NetworkProSettings {
                default_access_level: p.defaultaccesslevel,
                default_user_node_limit: p.defaultusernodelimit,
                default_user_client_limit: p.defaultuserclientlimit,
                allowed_users: p.allowedusers,
                allowed_groups: p.allowedgroups,
            }),
            name: n.netid,
        }
    }
}

// ━━ Host ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl From<HostResponse> for Host {
    fn from(h: HostResponse) -> Self {
        Host {
            id: EntityId::from(h.id.as_str()),
            endpoint_ip: h.endpointip.parse().ok(),
            endpoint_ipv6: h.endpointipv6.parse().ok(),
            listen_port: u16::try_from(h.listenport).unwrap_or(0),
            mtu: u32_or_zero(h.mtu),
            persistent_keepalive: u32_or_zero(h.persistentkeepalive),
            nat_type: h.nat_type.parse().ok(),
            node_ids: ids(&h.nodes),
            mac: non_empty(&h.macaddress).map(MacAddress::new),
            name: h.name,
            version: h.version,
            os: h.os,
            public_key: h.publickey,
            is_default: h.isdefault,
            is_static: h.isstatic,
        }
    }
}

// ━━ Node ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl From<NodeResponse> for Node {
    fn from(n: NodeResponse) -> Self {
        Node {
            id: EntityId::from(n.id.as_str()),
            host_id: EntityId::from(n.hostid.as_str()),
            address: parse_v4_addr(&n.address),
            address6: parse_v6_addr(&n.address6),
            connected: n.connected,
            status: n.status.parse().unwrap_or(NodeStatus::Unknown),
            last_check_in: epoch_to_datetime(n.lastcheckin),

            is_relay: n.isrelay,
            relayed_nodes: ids(&n.relaynodes),
            is_relayed: n.isrelayed,
            relayed_by: EntityId::from_optional(&n.relayedby),

            is_egress_gateway: n.isegressgateway,
            egress_ranges: parse_nets(&n.egressgatewayranges),
            egress_nat: n.egressgatewaynatenabled,

            is_ingress_gateway: n.isingressgateway,
            ingress_dns: non_empty(&n.ingressdns),

            is_internet_gateway: n.isinternetgateway,
            internet_gateway_clients: ids(&n.inet_node_req.inet_node_client_ids),
            internet_gateway_id: EntityId::from_optional(&n.internetgw_node_id),

            tags: map_keys(&n.tags),
            pending_delete: n.pendingdelete,
            expires_at: epoch_to_datetime(n.expdatetime),
            network: n.network,
        }
    }
}

// ━━ External clients ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl From<ExtClientResponse> for ExtClient {
    fn from(c: ExtClientResponse) -> Self {
        ExtClient {
            id: EntityId::Name(format!("{}/{}", c.network, c.clientid)),
            gateway_id: EntityId::from(c.ingressgatewayid.as_str()),
            address: parse_v4_addr(&c.address),
            address6: parse_v6_addr(&c.address6),
            dns: non_empty(&c.dns),
            extra_allowed_ips: parse_nets(&c.extraallowedips),
            owner: non_empty(&c.ownerid),
            tags: map_keys(&c.tags),
            name: c.clientid,
            network: c.network,
            gateway_endpoint: c.ingressgatewayendpoint,
            public_key: c.publickey,
            enabled: c.enabled,
        }
    }
}

// ━━ Users ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl From<UserResponse> for User {
    fn from(u: UserResponse) -> Self {
        let platform_role = if u.platform_role_id.is_empty() {
            if u.issuperadmin {
                PlatformRole::SuperAdmin
            } else if u.isadmin {
                PlatformRole::Admin
            } else {
                PlatformRole::PlatformUser
            }
        } else {
            PlatformRole::from(u.platform_role_id.as_str())
        };

        User {
            id: EntityId::Name(u.username.clone()),
            platform_role,
            is_super_admin: u.issuperadmin,
            is_admin: u.isadmin,
            auth_type: u.auth_type.parse().unwrap_or(AuthType::Basic),
            network_roles: role_map(&u.network_roles),
            groups: map_keys(&u.user_group_ids),
            last_login: parse_datetime(&u.last_login_time),
            username: u.username,
        }
    }
}

impl From<UserGroupResponse> for UserGroup {
    fn from(g: UserGroupResponse) -> Self {
        UserGroup {
            id: EntityId::Name(g.id.clone()),
            network_roles: role_map(&g.network_roles),
            description: g.meta_data,
            name: g.id,
        }
    }
}

impl From<UserRoleResponse> for UserRole {
    fn from(r: UserRoleResponse) -> Self {
        UserRole {
            id: EntityId::Name(r.id.clone()),
            network: non_empty(&r.network_id),
            is_default: r.default,
            full_access: r.full_access,
            deny_dashboard_access: r.deny_dashboard_access,
            description: r.meta_data,
            name: r.id,
        }
    }
}

// ━━ ACLs ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn acl_members(raw: Vec<AclPolicyTag>) -> Vec<AclMember> {
    raw.into_iter()
        .filter_map(|t| {
            let kind: AclMemberKind = t.id.parse().ok()?;
            Some(AclMember {
                kind,
                value: t.value,
            })
        })
        .collect()
}

/// Domain member → wire `{id, value}`.
pub(crate) fn acl_member_to_wire(member: &AclMember) -> AclPolicyTag {
    AclPolicyTag {
        id: member.kind.to_string(),
        value: member.value.clone(),
    }
}

impl From<AclResponse> for AclRule {
    fn from(a: AclResponse) -> Self {
        AclRule {
            id: EntityId::from(a.id.as_str()),
            policy_type: a.policy_type.parse().unwrap_or(PolicyType::Device),
            sources: acl_members(a.src_type),
            destinations: acl_members(a.dst_type),
            direction: TrafficDirection::from_wire(a.allowed_traffic_direction),
            created_at: parse_datetime(&a.created_at),
            name: a.name,
            network: a.network_id,
            enabled: a.enabled,
            is_default: a.default,
            description: a.meta_data,
            created_by: a.created_by,
        }
    }
}

// ━━ Supporting ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl From<TagResponse> for Tag {
    fn from(t: TagResponse) -> Self {
        Tag {
            id: EntityId::Name(t.id),
            tagged_nodes: t
                .tagged_nodes
                .iter()
                .map(|n| EntityId::from(n.id.as_str()))
                .collect(),
            created_at: parse_datetime(&t.created_at),
            name: t.tag_name,
            network: t.network,
            used_by_count: t.used_by_count,
            created_by: t.created_by,
        }
    }
}

impl From<DnsEntryResponse> for DnsEntry {
    fn from(d: DnsEntryResponse) -> Self {
        DnsEntry {
            address: d.address.parse().ok(),
            address6: d.address6.parse().ok(),
            name: d.name,
            network: d.network,
        }
    }
}

impl From<EnrollmentKeyResponse> for EnrollmentKey {
    fn from(k: EnrollmentKeyResponse) -> Self {
        EnrollmentKey {
            id: EntityId::from(k.value.as_str()),
            expiration: parse_datetime(&k.expiration),
            uses_remaining: u32_or_zero(k.uses_remaining),
            key_type: EnrollmentKeyType::from_wire(k.key_type),
            token: k.token,
            networks: k.networks,
            tags: k.tags,
            unlimited: k.unlimited,
        }
    }
}

impl From<ServerConfigResponse> for ServerInfo {
    fn from(s: ServerConfigResponse) -> Self {
        ServerInfo {
            version: s.version,
            is_pro: s.is_pro,
            session_validity_ns: s.jwt_validity_duration,
            default_domain: s.default_domain,
            db_connected: None,
            broker_connected: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node_json(extra: Value) -> NodeResponse {
        let mut base = serde_json::json!({
            "id": "2b5c7e1a-54d1-4c3e-a8f0-2f9a1c8d3e01",
            "hostid": "6f1c9e4a-8c1a-4b4e-9d55-0d2f0b6a7c11",
            "network": "office",
            "address": "10.101.0.3/16",
            "status": "online",
            "lastcheckin": 1_718_000_000
        });
        if let (Some(obj), Some(add)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in add {
                obj.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn node_parses_addresses_and_roles() {
        let node = Node::from(node_json(serde_json::json!({
            "isegressgateway": true,
            "egressgatewayranges": ["192.168.50.0/24", "garbage"],
            "egressgatewaynatenabled": "yes",
            "relayedby": "",
            "internetgw_node_id": "a1",
            "tags": { "office.web": {} }
        })));

        assert_eq!(node.address.unwrap().to_string(), "10.101.0.3/16");
        assert_eq!(node.status, NodeStatus::Online);
        assert!(node.last_check_in.is_some());
        assert_eq!(node.egress_ranges.len(), 1);
        assert!(node.egress_nat);
        assert!(node.relayed_by.is_none());
        assert_eq!(node.internet_gateway_id, Some(EntityId::from("a1")));
        assert_eq!(node.tags, vec!["office.web".to_owned()]);
    }

    #[test]
    fn bare_address_becomes_host_route() {
        assert_eq!(
            parse_v4_addr("10.101.0.9").unwrap().to_string(),
            "10.101.0.9/32"
        );
        assert!(parse_v4_addr("").is_none());
    }

    #[test]
    fn network_default_acl_no_is_deny() {
        let net = Network::from(NetworkResponse {
            netid: "office".into(),
            addressrange: "10.101.0.0/16".into(),
            defaultacl: "no".into(),
            ..NetworkResponse::default()
        });
        assert_eq!(net.default_acl, DefaultAclPolicy::Deny);
        assert!(net.ipv6_range.is_none());
        assert_eq!(net.id, EntityId::Name("office".into()));
    }

    #[test]
    fn zero_time_is_never() {
        assert!(parse_datetime("0001-01-01T00:00:00Z").is_none());
        assert!(parse_datetime("2024-06-15T10:30:00Z").is_some());
    }

    #[test]
    fn user_without_role_id_derives_from_flags() {
        let user = User::from(UserResponse {
            username: "root".into(),
            issuperadmin: true,
            ..UserResponse::default()
        });
        assert_eq!(user.platform_role, PlatformRole::SuperAdmin);
    }

    #[test]
    fn acl_drops_unknown_member_kinds() {
        let acl = AclRule::from(AclResponse {
            id: "acl-1".into(),
            name: "web".into(),
            network_id: "office".into(),
            policy_type: "user-policy".into(),
            src_type: vec![
                AclPolicyTag {
                    id: "user-group".into(),
                    value: "ops".into(),
                },
                AclPolicyTag {
                    id: "planet".into(),
                    value: "mars".into(),
                },
            ],
            allowed_traffic_direction: 0,
            ..AclResponse::default()
        });
        assert_eq!(acl.policy_type, PolicyType::User);
        assert_eq!(acl.sources.len(), 1);
        assert_eq!(acl.direction, TrafficDirection::Uni);
    }
}
