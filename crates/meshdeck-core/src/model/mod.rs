// ── Canonical domain model ──
//
// Strongly-typed views of controller entities. Wire strings are parsed
// into IP networks, enums and timestamps once, in `convert`.

pub mod acl;
pub mod entity_id;
pub mod ext_client;
pub mod host;
pub mod network;
pub mod node;
pub mod supporting;
pub mod user;

pub use acl::{AclMember, AclMemberKind, AclRule, PolicyType, TrafficDirection};
pub use entity_id::{EntityId, MacAddress};
pub use ext_client::ExtClient;
pub use host::{Host, NatType};
pub use network::{DefaultAclPolicy, Network, NetworkProSettings};
pub use node::{ExtendedNode, Node, NodeStatus};
pub use supporting::{DnsEntry, EnrollmentKey, EnrollmentKeyType, ServerInfo, Tag};
pub use user::{AuthType, PlatformRole, User, UserGroup, UserRole};
