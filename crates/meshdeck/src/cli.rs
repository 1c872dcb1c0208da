//! Clap derive structures for the `meshdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Only depends on clap and clap_complete so `build.rs` can include it.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// meshdeck -- administration console for WireGuard mesh controllers
#[derive(Debug, Parser)]
#[command(
    name = "meshdeck",
    version,
    about = "Administer overlay networks from the command line",
    long_about = "Manage networks, hosts, relays, gateways, remote-access clients,\n\
        access control, DNS and users on an overlay-network controller.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "MESHDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server API URL (overrides profile)
    #[arg(long, short = 's', env = "MESHDECK_SERVER", global = true)]
    pub server: Option<String>,

    /// Bearer token or master key (overrides profile)
    #[arg(long, env = "MESHDECK_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MESHDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "MESHDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "MESHDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage networks
    #[command(alias = "net", alias = "n")]
    Networks(NetworksArgs),

    /// Manage hosts and their network memberships
    #[command(alias = "host")]
    Hosts(HostsArgs),

    /// Inspect and remove nodes
    #[command(alias = "node")]
    Nodes(NodesArgs),

    /// Manage relays and the nodes they relay
    #[command(alias = "relay")]
    Relays(RelaysArgs),

    /// Manage egress gateways
    Egress(EgressArgs),

    /// Manage remote-access (ingress) gateways
    #[command(alias = "remote-access")]
    Ingress(IngressArgs),

    /// Manage internet gateways
    #[command(alias = "igw")]
    InternetGateways(InternetGatewaysArgs),

    /// Manage remote-access clients
    #[command(alias = "ext")]
    ExtClients(ExtClientsArgs),

    /// Manage users
    #[command(alias = "user")]
    Users(UsersArgs),

    /// Manage user groups
    #[command(alias = "group")]
    Groups(GroupsArgs),

    /// List user roles
    Roles(RolesArgs),

    /// Manage access control policies
    #[command(alias = "acl")]
    Acls(AclsArgs),

    /// Manage node tags
    #[command(alias = "tag")]
    Tags(TagsArgs),

    /// Manage DNS entries
    Dns(DnsArgs),

    /// Manage enrollment keys
    #[command(alias = "keys")]
    EnrollmentKeys(EnrollmentKeysArgs),

    /// Server version and health
    Server(ServerArgs),

    /// Guided setup of a new network
    Setup,

    /// Exchange username and password for a session token
    Login(LoginArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Optional network filter for list commands.
#[derive(Debug, Args)]
pub struct NetworkFilter {
    /// Only show entries of this network
    #[arg(long, short = 'n')]
    pub network: Option<String>,
}

/// `<network> <node>` addressing shared by topology commands.
#[derive(Debug, Args)]
pub struct NodeRef {
    /// Network id
    pub network: String,

    /// Node id or host name
    pub node: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AclPolicy {
    Allow,
    Deny,
}

// ── Networks ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NetworksArgs {
    #[command(subcommand)]
    pub command: NetworksCommand,
}

#[derive(Debug, Subcommand)]
pub enum NetworksCommand {
    /// List networks
    #[command(alias = "ls")]
    List,

    /// Show one network
    Get { network: String },

    /// Create a network
    Create {
        /// Network id (lowercase letters, digits, '-')
        #[arg(required_unless_present = "from_file")]
        name: Option<String>,

        /// IPv4 address range (CIDR)
        #[arg(long)]
        ipv4: Option<String>,

        /// IPv6 address range (CIDR)
        #[arg(long)]
        ipv6: Option<String>,

        /// Default ACL policy
        #[arg(long, value_enum)]
        default_acl: Option<AclPolicy>,

        /// Default DNS nameserver (repeatable)
        #[arg(long = "nameserver")]
        nameservers: Vec<String>,

        /// Default persistent keepalive (seconds)
        #[arg(long)]
        keepalive: Option<u32>,

        /// Default interface MTU
        #[arg(long)]
        mtu: Option<u32>,

        /// Read the request from a JSON file
        #[arg(long, short = 'F', conflicts_with_all = ["name", "ipv4", "ipv6"])]
        from_file: Option<PathBuf>,
    },

    /// Update a network
    Update {
        network: String,

        #[arg(long)]
        ipv4: Option<String>,

        #[arg(long)]
        ipv6: Option<String>,

        #[arg(long, value_enum)]
        default_acl: Option<AclPolicy>,

        /// Replace the nameserver list (repeatable)
        #[arg(long = "nameserver")]
        nameservers: Option<Vec<String>>,

        #[arg(long)]
        keepalive: Option<u32>,

        #[arg(long)]
        mtu: Option<u32>,

        /// Read the changes from a JSON file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,
    },

    /// Delete a network and all of its nodes
    Delete { network: String },
}

// ── Hosts ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HostsArgs {
    #[command(subcommand)]
    pub command: HostsCommand,
}

#[derive(Debug, Subcommand)]
pub enum HostsCommand {
    /// List hosts
    #[command(alias = "ls")]
    List,

    /// Show one host
    Get {
        /// Host id or name
        host: String,
    },

    /// Update host settings
    Update {
        /// Host id or name
        host: String,

        /// New host name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        listen_port: Option<u32>,

        #[arg(long)]
        mtu: Option<u32>,

        /// Persistent keepalive (seconds)
        #[arg(long)]
        keepalive: Option<u32>,

        /// Join new networks automatically
        #[arg(long)]
        default: Option<bool>,

        /// Keep the endpoint fixed
        #[arg(long = "static")]
        is_static: Option<bool>,

        /// Public endpoint address
        #[arg(long)]
        endpoint_ip: Option<String>,
    },

    /// Delete a host
    Delete { host: String },

    /// Add a host to a network
    Join { host: String, network: String },

    /// Remove a host from a network
    Leave { host: String, network: String },
}

// ── Nodes ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NodesArgs {
    #[command(subcommand)]
    pub command: NodesCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CandidateRole {
    Relay,
    Relayed,
    InternetGateway,
    InternetClient,
    Ingress,
    Egress,
}

#[derive(Debug, Subcommand)]
pub enum NodesCommand {
    /// List nodes
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Show one node
    Get(NodeRef),

    /// Remove a node from its network
    Delete(NodeRef),

    /// Which nodes may take a topology role
    Candidates {
        network: String,

        #[arg(long, value_enum)]
        role: CandidateRole,

        /// Relay being edited (keeps its own relayed nodes selectable)
        #[arg(long)]
        relay: Option<String>,

        /// Internet gateway the clients would attach to
        #[arg(long)]
        gateway: Option<String>,
    },
}

// ── Relays ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RelaysArgs {
    #[command(subcommand)]
    pub command: RelaysCommand,
}

#[derive(Debug, Subcommand)]
pub enum RelaysCommand {
    /// List relays
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Make a node a relay
    Create {
        #[command(flatten)]
        target: NodeRef,

        /// Node to relay (repeatable)
        #[arg(long = "relayed", required = true)]
        relayed: Vec<String>,
    },

    /// Replace the set of relayed nodes
    Set {
        #[command(flatten)]
        target: NodeRef,

        #[arg(long = "relayed")]
        relayed: Vec<String>,
    },

    /// Move a relayed node to another relay
    Move {
        #[command(flatten)]
        target: NodeRef,

        /// Current relay
        #[arg(long)]
        from: String,

        /// New relay
        #[arg(long)]
        to: String,
    },

    /// Stop relaying through a node
    Delete(NodeRef),
}

// ── Egress ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EgressArgs {
    #[command(subcommand)]
    pub command: EgressCommand,
}

#[derive(Debug, Subcommand)]
pub enum EgressCommand {
    /// List egress gateways
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Make a node an egress gateway
    Create {
        #[command(flatten)]
        target: NodeRef,

        /// Range routed through the gateway (repeatable)
        #[arg(long = "range", required = true)]
        ranges: Vec<String>,

        /// Do not masquerade egress traffic
        #[arg(long)]
        no_nat: bool,
    },

    /// Replace the egress ranges (none removes the gateway)
    Update {
        #[command(flatten)]
        target: NodeRef,

        #[arg(long = "range")]
        ranges: Vec<String>,
    },

    /// Remove the egress gateway
    Delete(NodeRef),
}

// ── Ingress ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct IngressArgs {
    #[command(subcommand)]
    pub command: IngressCommand,
}

#[derive(Debug, Subcommand)]
pub enum IngressCommand {
    /// List remote-access gateways
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Make a node a remote-access gateway
    Create {
        #[command(flatten)]
        target: NodeRef,

        /// DNS server handed to clients
        #[arg(long)]
        dns: Option<String>,
    },

    /// Remove the gateway and its clients
    Delete(NodeRef),
}

// ── Internet gateways ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InternetGatewaysArgs {
    #[command(subcommand)]
    pub command: InternetGatewaysCommand,
}

#[derive(Debug, Subcommand)]
pub enum InternetGatewaysCommand {
    /// List internet gateways
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Make a node an internet gateway
    Create {
        #[command(flatten)]
        target: NodeRef,

        /// Node routed through the gateway (repeatable)
        #[arg(long = "client")]
        clients: Vec<String>,
    },

    /// Replace the attached clients
    Update {
        #[command(flatten)]
        target: NodeRef,

        #[arg(long = "client")]
        clients: Vec<String>,
    },

    /// Remove the internet gateway
    Delete(NodeRef),
}

// ── External clients ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ExtClientsArgs {
    #[command(subcommand)]
    pub command: ExtClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ExtClientsCommand {
    /// List remote-access clients
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Show one client
    Get { network: String, client: String },

    /// Create a client on a remote-access gateway
    Create {
        network: String,

        /// Gateway node id or host name
        #[arg(long)]
        gateway: String,

        /// Client id (generated when omitted)
        #[arg(long = "id")]
        client_id: Option<String>,

        /// Bring your own WireGuard public key
        #[arg(long)]
        public_key: Option<String>,

        #[arg(long)]
        dns: Option<String>,

        /// Extra allowed IP range (repeatable)
        #[arg(long = "allowed-ip")]
        extra_allowed_ips: Vec<String>,

        /// Create the client disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Update a client
    Update {
        network: String,
        client: String,

        /// Rename the client
        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        public_key: Option<String>,

        #[arg(long)]
        dns: Option<String>,

        /// Replace the extra allowed IPs (repeatable)
        #[arg(long = "allowed-ip")]
        extra_allowed_ips: Option<Vec<String>>,
    },

    /// Enable a client
    Enable { network: String, client: String },

    /// Disable a client
    Disable { network: String, client: String },

    /// Delete a client
    Delete { network: String, client: String },

    /// Print the WireGuard configuration of a client
    Config {
        network: String,
        client: String,

        /// Write to a file instead of stdout
        #[arg(long, short = 'O')]
        out: Option<PathBuf>,
    },
}

// ── Users ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List users
    #[command(alias = "ls")]
    List,

    /// Show one user
    Get { username: String },

    /// Create a user (prompts for the password)
    Create {
        username: String,

        /// Platform role id (admin, platform-user, service-user, ...)
        #[arg(long, default_value = "platform-user")]
        role: String,

        /// Network role as NETWORK=ROLE (repeatable)
        #[arg(long = "network-role")]
        network_roles: Vec<String>,

        /// Group membership (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,
    },

    /// Update a user
    Update {
        username: String,

        #[arg(long)]
        role: Option<String>,

        /// Replace network roles, NETWORK=ROLE (repeatable)
        #[arg(long = "network-role")]
        network_roles: Option<Vec<String>>,

        /// Replace group memberships (repeatable)
        #[arg(long = "group")]
        groups: Option<Vec<String>>,

        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },

    /// Delete a user
    Delete { username: String },
}

// ── Groups ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List user groups
    #[command(alias = "ls")]
    List,

    /// Create a user group
    Create {
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Network role as NETWORK=ROLE (repeatable)
        #[arg(long = "network-role")]
        network_roles: Vec<String>,

        /// Initial member (repeatable)
        #[arg(long = "member")]
        members: Vec<String>,
    },

    /// Update a user group
    Update {
        id: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long = "network-role")]
        network_roles: Option<Vec<String>>,
    },

    /// Delete a user group
    Delete { id: String },
}

// ── Roles ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RolesArgs {
    /// Only platform roles
    #[arg(long, conflicts_with = "network")]
    pub platform: bool,

    /// Only roles scoped to this network
    #[arg(long, short = 'n')]
    pub network: Option<String>,
}

// ── ACLs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AclsArgs {
    #[command(subcommand)]
    pub command: AclsCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AclType {
    User,
    Device,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Direction {
    Uni,
    Bi,
}

#[derive(Debug, Subcommand)]
pub enum AclsCommand {
    /// List policies
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Show one policy
    Get { id: String },

    /// Create a policy
    Create {
        network: String,
        name: String,

        #[arg(long = "type", value_enum, default_value = "device")]
        policy_type: AclType,

        /// Source member as KIND:VALUE (user, user-group, tag, device)
        #[arg(long = "src", required = true)]
        sources: Vec<String>,

        /// Destination member as KIND:VALUE (tag, device)
        #[arg(long = "dst", required = true)]
        destinations: Vec<String>,

        #[arg(long, value_enum, default_value = "bi")]
        direction: Direction,

        #[arg(long, default_value = "")]
        description: String,

        /// Create the policy disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Update a policy
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "src")]
        sources: Option<Vec<String>>,

        #[arg(long = "dst")]
        destinations: Option<Vec<String>>,

        #[arg(long, value_enum)]
        direction: Option<Direction>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        enabled: Option<bool>,
    },

    /// Delete a policy
    Delete { id: String },
}

// ── Tags ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TagsArgs {
    #[command(subcommand)]
    pub command: TagsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    /// List tags
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Create a tag
    Create {
        network: String,
        name: String,

        /// Node id or host name to tag (repeatable)
        #[arg(long = "node")]
        nodes: Vec<String>,
    },

    /// Rename a tag or replace its nodes
    Update {
        id: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(long = "node")]
        nodes: Option<Vec<String>>,
    },

    /// Delete a tag
    Delete { id: String },
}

// ── DNS ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DnsArgs {
    #[command(subcommand)]
    pub command: DnsCommand,
}

#[derive(Debug, Subcommand)]
pub enum DnsCommand {
    /// List DNS entries
    #[command(alias = "ls")]
    List(NetworkFilter),

    /// Create a DNS entry
    Create {
        network: String,
        name: String,

        /// IPv4 address
        #[arg(long)]
        address: Option<String>,

        /// IPv6 address
        #[arg(long)]
        address6: Option<String>,
    },

    /// Delete a DNS entry
    Delete { network: String, name: String },
}

// ── Enrollment keys ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EnrollmentKeysArgs {
    #[command(subcommand)]
    pub command: EnrollmentKeysCommand,
}

#[derive(Debug, Subcommand)]
pub enum EnrollmentKeysCommand {
    /// List enrollment keys
    #[command(alias = "ls")]
    List,

    /// Create an enrollment key (choose one of --expires, --uses, --unlimited)
    Create {
        /// Network joined with the key (repeatable)
        #[arg(long = "network")]
        networks: Vec<String>,

        /// Tag applied to enrolled hosts (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Expiry as RFC 3339 timestamp
        #[arg(long)]
        expires: Option<String>,

        /// Number of enrollments allowed
        #[arg(long)]
        uses: Option<u32>,

        #[arg(long)]
        unlimited: bool,
    },

    /// Replace the networks or tags of a key
    Update {
        id: String,

        #[arg(long = "network")]
        networks: Option<Vec<String>>,

        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },

    /// Delete an enrollment key
    Delete { id: String },
}

// ── Server ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Version, edition and session settings
    #[command(alias = "status")]
    Info,
}

// ── Login ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (defaults to the profile's)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Store the token in the system keyring for this profile
    #[arg(long)]
    pub save: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecretKindArg {
    Token,
    Password,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the current configuration
    Show,

    /// Set a profile value
    Set {
        /// server, auth_mode, token, token_env, username, password,
        /// ca_cert, insecure or timeout
        key: String,
        value: String,
    },

    /// List profiles
    Profiles,

    /// Set the default profile
    Use { name: String },

    /// Store a token or password in the system keyring for the active profile
    SetSecret {
        #[arg(long, value_enum, default_value = "token")]
        kind: SecretKindArg,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
