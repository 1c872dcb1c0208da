//! Wire types for the controller REST API.
//!
//! Field names follow the server's JSON exactly (mostly lowercase run-on
//! keys such as `addressrange6`). Records that the server expects back
//! verbatim on `PUT` keep a flattened `extra` map so unknown fields survive
//! a read-modify-write round trip.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Envelope ─────────────────────────────────────────────────────────

/// `{ "Code": 200, "Message": "...", "Response": ... }` wrapper used by the
/// login endpoint and the `/api/v1/` handlers.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "Code", default)]
    pub code: u16,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "Response")]
    pub response: T,
}

/// The server spells booleans as `"yes"`/`"no"` in some places and as JSON
/// booleans in others.
fn yes_no_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flex {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flex>::deserialize(deserializer)? {
        Some(Flex::Bool(b)) => b,
        Some(Flex::Text(s)) => matches!(s.to_ascii_lowercase().as_str(), "yes" | "true" | "on"),
        None => false,
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Render a boolean the way the server's `"yes"`/`"no"` fields expect.
pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

// ── Auth ─────────────────────────────────────────────────────────────

/// Body of `POST /api/users/adm/authenticate`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `Response` payload of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(rename = "AuthToken")]
    pub auth_token: String,
    #[serde(rename = "UserName", default)]
    pub user_name: String,
}

// ── Server ───────────────────────────────────────────────────────────

/// `GET /api/server/getconfig`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfigResponse {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "IsPro", default, deserialize_with = "yes_no_or_bool")]
    pub is_pro: bool,
    /// Session validity as a Go `time.Duration`, i.e. nanoseconds.
    #[serde(rename = "JwtValidityDuration", default)]
    pub jwt_validity_duration: i64,
    #[serde(rename = "DefaultDomain", default)]
    pub default_domain: String,
    #[serde(rename = "Verbosity", default)]
    pub verbosity: i32,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// `GET /api/server/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatusResponse {
    #[serde(default)]
    pub db_connected: bool,
    #[serde(default)]
    pub broker_connected: bool,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default)]
    pub license_error: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── Networks ─────────────────────────────────────────────────────────

/// Pro-tier access settings attached to a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkProSettings {
    #[serde(default)]
    pub defaultaccesslevel: i32,
    #[serde(default)]
    pub defaultusernodelimit: i32,
    #[serde(default)]
    pub defaultuserclientlimit: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowedusers: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowedgroups: Vec<String>,
}

/// Network record from `GET /api/networks`; also the `POST`/`PUT` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub netid: String,
    #[serde(default)]
    pub addressrange: String,
    #[serde(default)]
    pub addressrange6: String,
    /// `"yes"` allows all peers by default, `"no"` denies.
    #[serde(default)]
    pub defaultacl: String,
    #[serde(default)]
    pub defaultkeepalive: i32,
    #[serde(default)]
    pub defaultmtu: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nameservers: Vec<String>,
    #[serde(default)]
    pub nodeslastmodified: i64,
    #[serde(default)]
    pub networklastmodified: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prosettings: Option<NetworkProSettings>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── Hosts ────────────────────────────────────────────────────────────

/// Host record from `GET /api/hosts`; also the `PUT` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostResponse {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub endpointip: String,
    #[serde(default)]
    pub endpointipv6: String,
    #[serde(default)]
    pub listenport: i32,
    #[serde(default)]
    pub publickey: String,
    #[serde(default)]
    pub mtu: i32,
    #[serde(default)]
    pub persistentkeepalive: i32,
    #[serde(default)]
    pub nat_type: String,
    #[serde(default)]
    pub isdefault: bool,
    #[serde(default)]
    pub isstatic: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub macaddress: String,
    #[serde(default)]
    pub verbosity: i32,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── Nodes ────────────────────────────────────────────────────────────

/// Internet-gateway client list, as embedded in a node and as the body of
/// the `inet_gw` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InetNodeRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub inet_node_client_ids: Vec<String>,
}

/// Node record from `GET /api/nodes`; also the `PUT` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub id: String,
    #[serde(default)]
    pub hostid: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub address6: String,
    #[serde(default)]
    pub connected: bool,
    /// One of `online`, `offline`, `warning`, `error`, `unknown`.
    #[serde(default)]
    pub status: String,
    /// Unix seconds.
    #[serde(default)]
    pub lastcheckin: i64,
    #[serde(default)]
    pub isrelay: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relaynodes: Vec<String>,
    #[serde(default)]
    pub isrelayed: bool,
    #[serde(default)]
    pub relayedby: String,
    #[serde(default)]
    pub isegressgateway: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub egressgatewayranges: Vec<String>,
    #[serde(default, deserialize_with = "yes_no_or_bool")]
    pub egressgatewaynatenabled: bool,
    #[serde(default)]
    pub isingressgateway: bool,
    #[serde(default)]
    pub ingressdns: String,
    #[serde(default)]
    pub isinternetgateway: bool,
    #[serde(default)]
    pub inet_node_req: InetNodeRequest,
    #[serde(default)]
    pub internetgw_node_id: String,
    /// Tag ids mapped to empty objects.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, Value>,
    #[serde(default)]
    pub pendingdelete: bool,
    #[serde(default)]
    pub expdatetime: i64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── Gateways ─────────────────────────────────────────────────────────

/// Body of `POST /api/nodes/{net}/{id}/createrelay`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRelayRequest {
    pub netid: String,
    pub nodeid: String,
    /// Node ids to be relayed.
    pub relayaddrs: Vec<String>,
}

/// Body of `POST /api/nodes/{net}/{id}/creategateway`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EgressGatewayRequest {
    pub ranges: Vec<String>,
    /// `"yes"` or `"no"`.
    pub natenabled: String,
}

/// Body of `POST /api/nodes/{net}/{id}/createingress`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngressGatewayRequest {
    pub extclientdns: String,
}

// ── External clients ─────────────────────────────────────────────────

/// External client record from `GET /api/extclients`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtClientResponse {
    pub clientid: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub ingressgatewayid: String,
    #[serde(default)]
    pub ingressgatewayendpoint: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub address6: String,
    #[serde(default)]
    pub publickey: String,
    #[serde(default)]
    pub dns: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extraallowedips: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub ownerid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, Value>,
    #[serde(default)]
    pub lastmodified: i64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body of `POST /api/extclients/{net}/{gw}` and
/// `PUT /api/extclients/{net}/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtClientRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub clientid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publickey: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dns: String,
    pub extraallowedips: Vec<String>,
    pub enabled: bool,
    pub tags: BTreeMap<String, Value>,
}

// ── Users ────────────────────────────────────────────────────────────

/// User record from `GET /api/users`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
    #[serde(default)]
    pub isadmin: bool,
    #[serde(default)]
    pub issuperadmin: bool,
    #[serde(default)]
    pub platform_role_id: String,
    /// network id → role id → `{}`
    #[serde(default, deserialize_with = "null_as_default")]
    pub network_roles: BTreeMap<String, BTreeMap<String, Value>>,
    /// group id → `{}`
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_group_ids: BTreeMap<String, Value>,
    #[serde(default)]
    pub auth_type: String,
    /// RFC 3339; the zero time `0001-01-01T00:00:00Z` means never.
    #[serde(default)]
    pub last_login_time: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body of `POST`/`PUT /api/users/{username}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserRequest {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub isadmin: bool,
    pub issuperadmin: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub platform_role_id: String,
    pub network_roles: BTreeMap<String, BTreeMap<String, Value>>,
    pub user_group_ids: BTreeMap<String, Value>,
}

/// User group from `GET /api/v1/users/groups`; also the `PUT` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserGroupResponse {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub network_roles: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    pub meta_data: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body of `POST /api/v1/users/group`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateUserGroupRequest {
    pub user_group: UserGroupResponse,
    pub members: Vec<String>,
}

/// Role template from `GET /api/v1/users/roles`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRoleResponse {
    pub id: String,
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub full_access: bool,
    #[serde(default)]
    pub deny_dashboard_access: bool,
    #[serde(default)]
    pub meta_data: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── ACLs ─────────────────────────────────────────────────────────────

/// One member of an ACL source or destination set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclPolicyTag {
    /// `user`, `user-group`, `tag` or `device`.
    pub id: String,
    /// Member identifier, or `*` for every member of that type.
    pub value: String,
}

/// ACL rule from `GET /api/v1/acls`; also the `POST`/`PUT` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AclResponse {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub network_id: String,
    #[serde(default)]
    pub meta_data: String,
    #[serde(default)]
    pub default: bool,
    /// `user-policy` or `device-policy`.
    pub policy_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub src_type: Vec<AclPolicyTag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dst_type: Vec<AclPolicyTag>,
    /// `0` uni-directional, `1` bi-directional.
    #[serde(default)]
    pub allowed_traffic_direction: u8,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── Tags ─────────────────────────────────────────────────────────────

/// Minimal node reference sent when (re)assigning tagged nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedNodeRef {
    pub id: String,
}

/// Tag from `GET /api/v1/tags`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: String,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub network: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tagged_nodes: Vec<TaggedNodeRef>,
    #[serde(default)]
    pub used_by_count: u32,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
}

/// Body of `POST /api/v1/tags`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTagRequest {
    pub tag_name: String,
    pub network: String,
    pub tagged_nodes: Vec<TaggedNodeRef>,
}

/// Body of `PUT /api/v1/tags`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateTagRequest {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub new_name: String,
    pub network: String,
    pub tagged_nodes: Vec<TaggedNodeRef>,
}

// ── DNS ──────────────────────────────────────────────────────────────

/// DNS entry; both the `GET` record and the `POST` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsEntryResponse {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub address6: String,
    pub name: String,
    #[serde(default)]
    pub network: String,
}

// ── Enrollment keys ──────────────────────────────────────────────────

/// Enrollment key from `GET /api/v1/enrollment-keys`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentKeyResponse {
    pub value: String,
    #[serde(default)]
    pub token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub networks: Vec<String>,
    /// RFC 3339 expiry; the zero time means no expiry.
    #[serde(default)]
    pub expiration: String,
    #[serde(default)]
    pub uses_remaining: i32,
    #[serde(default)]
    pub unlimited: bool,
    /// `0` undefined, `1` time-bound, `2` uses-bound, `3` unlimited.
    #[serde(default, rename = "type")]
    pub key_type: i32,
}

/// Body of `POST /api/v1/enrollment-keys` and `PUT .../{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrollmentKeyRequest {
    /// Unix seconds; `0` for no expiry.
    pub expiration: i64,
    pub uses_remaining: i32,
    pub networks: Vec<String>,
    pub unlimited: bool,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub key_type: i32,
}
