//! Data layer between `meshdeck-api` and the CLI.
//!
//! This crate owns the domain model, the entity store and the topology
//! rules of the meshdeck workspace:
//!
//! - **[`Controller`]**: owns one connection.
//!   [`connect()`](Controller::connect) authenticates and loads every
//!   collection, [`execute()`](Controller::execute) validates and runs a
//!   [`Command`]. [`Controller::oneshot()`](Controller::oneshot) wraps a
//!   single CLI invocation.
//!
//! - **[`DataStore`]**: lock-free storage built on `EntityCollection<T>`
//!   (`DashMap` + `tokio::sync::watch`). Holds networks, hosts, nodes,
//!   external clients, users, ACLs, tags, DNS entries and enrollment keys.
//!
//! - **[`topology`]**: which nodes may become relays, relayed nodes or
//!   gateways, plus the two-step relay move and egress replacement with
//!   compensating undo.
//!
//! - **[`setup`]**: the guided network setup, with step descriptors, pure
//!   transitions and the command plan.
//!
//! - **Domain model** ([`model`]): canonical types with [`EntityId`]
//!   covering both UUID and name identifiers.

pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod format;
pub mod model;
pub mod setup;
pub mod store;
pub mod stream;
pub mod topology;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::requests::*;
pub use command::{Command, CommandResult};
pub use config::{AuthCredentials, ControllerConfig, TlsVerification};
pub use controller::{ConnectionState, Controller};
pub use error::{Compensation, CoreError};
pub use store::DataStore;
pub use stream::EntityStream;
pub use topology::{Assignability, BlockReason, Candidate, Role};
pub use validate::{FieldError, ValidationErrors};

pub use model::{
    AclMember, AclMemberKind, AclRule, AuthType, DefaultAclPolicy, DnsEntry, EnrollmentKey,
    EnrollmentKeyType, EntityId, ExtClient, ExtendedNode, Host, MacAddress, NatType, Network,
    Node, NodeStatus, PlatformRole, PolicyType, ServerInfo, Tag, TrafficDirection, User,
    UserGroup, UserRole,
};
