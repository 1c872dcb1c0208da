//! Node command handlers, plus the role views shared with relays and gateways.

use chrono::Utc;
use serde::Serialize;
use tabled::Tabled;

use meshdeck_core::format::relative_age;
use meshdeck_core::{Candidate, Command as CoreCommand, Controller, ExtendedNode, Node, Role};

use crate::cli::{CandidateRole, GlobalOpts, NodeRef, NodesArgs, NodesCommand};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

// ── Serializable view ───────────────────────────────────────────────

/// A node with its host's display fields, for structured output.
#[derive(Serialize)]
pub struct NodeView<'a> {
    pub name: String,
    pub os: &'a str,
    pub version: &'a str,
    pub endpoint: String,
    #[serde(flatten)]
    pub node: &'a Node,
}

impl<'a> From<&'a ExtendedNode> for NodeView<'a> {
    fn from(n: &'a ExtendedNode) -> Self {
        Self {
            name: n.name(),
            os: n.os(),
            version: n.version(),
            endpoint: n.endpoint(),
            node: &n.node,
        }
    }
}

/// Nodes of `network`, or of every network.
pub fn list_nodes(controller: &Controller, network: Option<&str>) -> Vec<ExtendedNode> {
    match network {
        Some(net) => controller.store().nodes_in_network(net),
        None => controller.extended_nodes(),
    }
}

pub fn views(nodes: &[ExtendedNode]) -> Vec<NodeView<'_>> {
    nodes.iter().map(NodeView::from).collect()
}

/// Role flags as a short comma list, e.g. `relay, egress`.
pub fn roles(node: &Node) -> String {
    let mut roles = Vec::new();
    if node.is_relay {
        roles.push("relay");
    }
    if node.is_relayed {
        roles.push("relayed");
    }
    if node.is_egress_gateway {
        roles.push("egress");
    }
    if node.is_ingress_gateway {
        roles.push("remote-access");
    }
    if node.is_internet_gateway {
        roles.push("internet-gw");
    }
    if node.internet_gateway_id.is_some() {
        roles.push("igw-client");
    }
    output::join(&roles)
}

/// Display name of `id` within `network`, falling back to the id.
pub fn node_name(controller: &Controller, network: &str, id: &meshdeck_core::EntityId) -> String {
    controller
        .store()
        .resolve_node(network, &id.to_string())
        .map_or_else(|| id.to_string(), |n| n.name())
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Roles")]
    roles: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

fn row(v: &NodeView<'_>, color: bool) -> NodeRow {
    let n = v.node;
    NodeRow {
        name: v.name.clone(),
        network: n.network.clone(),
        address: n.address.map(|a| a.to_string()).unwrap_or_default(),
        status: output::status(n.status, color),
        roles: roles(n),
        last_seen: relative_age(n.last_check_in, Utc::now()),
    }
}

fn detail(v: &NodeView<'_>, controller: &Controller, color: bool) -> String {
    let n = v.node;
    let path = format!("/networks/{}/nodes/{}", n.network, v.name);
    let mut lines = vec![
        output::context_line(&path, &[("network", n.network.as_str())], color),
        String::new(),
        format!("ID:         {}", n.id),
        format!("Name:       {}", v.name),
        format!("Host:       {}", n.host_id),
        format!(
            "Address:    {}",
            n.address.map_or_else(|| "-".into(), |a| a.to_string())
        ),
        format!(
            "Address v6: {}",
            n.address6.map_or_else(|| "-".into(), |a| a.to_string())
        ),
        format!("Status:     {}", output::status(n.status, color)),
        format!("Connected:  {}", output::flag(n.connected, color)),
        format!("Last seen:  {}", relative_age(n.last_check_in, Utc::now())),
        format!("OS:         {} {}", v.os, v.version),
        format!("Roles:      {}", roles(n)),
    ];
    if !v.endpoint.is_empty() {
        lines.push(format!("Endpoint:   {}", v.endpoint));
    }
    if n.is_relay {
        let relayed: Vec<String> = n
            .relayed_nodes
            .iter()
            .map(|id| node_name(controller, &n.network, id))
            .collect();
        lines.push(format!("Relaying:   {}", output::join(&relayed)));
    }
    if let Some(ref relay) = n.relayed_by {
        lines.push(format!("Relayed by: {}", node_name(controller, &n.network, relay)));
    }
    if n.is_egress_gateway {
        lines.push(format!("Egress:     {}", output::join(&n.egress_ranges)));
    }
    if let Some(ref gw) = n.internet_gateway_id {
        lines.push(format!("Internet:   via {}", node_name(controller, &n.network, gw)));
    }
    if !n.tags.is_empty() {
        lines.push(format!("Tags:       {}", output::join(&n.tags)));
    }
    if n.pending_delete {
        lines.push("Pending delete".into());
    }
    lines.join("\n")
}

// ── Candidates ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct CandidateView {
    id: String,
    name: String,
    os: String,
    selectable: bool,
    reason: Option<String>,
}

impl From<&Candidate> for CandidateView {
    fn from(c: &Candidate) -> Self {
        Self {
            id: c.node.node.id.to_string(),
            name: c.node.name(),
            os: c.node.os().to_owned(),
            selectable: c.assignability.is_selectable(),
            reason: c.assignability.reason().map(ToString::to_string),
        }
    }
}

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "OS")]
    os: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

fn candidate_role(
    controller: &Controller,
    network: &str,
    role: CandidateRole,
    relay: Option<&str>,
    gateway: Option<&str>,
) -> Result<Role, CliError> {
    let resolve = |ident: Option<&str>| {
        ident
            .map(|i| util::resolve_node_id(controller, network, i))
            .transpose()
    };
    Ok(match role {
        CandidateRole::Relay => Role::Relay,
        CandidateRole::Relayed => Role::RelayedNode {
            editing_relay: resolve(relay)?,
        },
        CandidateRole::InternetGateway => Role::InternetGateway,
        CandidateRole::InternetClient => Role::InternetGatewayClient {
            gateway: resolve(gateway)?,
        },
        CandidateRole::Ingress => Role::IngressGateway,
        CandidateRole::Egress => Role::EgressGateway,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: NodesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        NodesCommand::List(filter) => {
            let controller = session.controller().await?;
            let nodes = list_nodes(controller, filter.network.as_deref());
            let out = output::render_list(
                &global.output,
                &views(&nodes),
                |v| row(v, color),
                |v| v.node.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NodesCommand::Get(NodeRef { network, node }) => {
            let controller = session.controller().await?;
            let n = util::resolve_node(controller, &network, &node)?;
            let out = output::render_single(
                &global.output,
                &NodeView::from(&n),
                |v| detail(v, controller, color),
                |v| v.node.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NodesCommand::Delete(NodeRef { network, node }) => {
            let id = util::resolve_node_id(session.controller().await?, &network, &node)?;
            let prompt = format!("Delete node {node} from {network}?");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteNode {
                    network: network.clone(),
                    id,
                })
                .await?;
            output::done(&format!("Node '{node}' deleted from '{network}'"), global.quiet);
            Ok(())
        }

        NodesCommand::Candidates {
            network,
            role,
            relay,
            gateway,
        } => {
            let controller = session.controller().await?;
            if controller.store().network(&network).is_none() {
                return Err(CliError::not_found("network", &network, "networks list"));
            }
            let role = candidate_role(
                controller,
                &network,
                role,
                relay.as_deref(),
                gateway.as_deref(),
            )?;
            let list: Vec<CandidateView> = controller
                .candidates(&network, &role)
                .iter()
                .map(CandidateView::from)
                .collect();
            let out = output::render_list(
                &global.output,
                &list,
                |c| CandidateRow {
                    name: c.name.clone(),
                    os: c.os.clone(),
                    available: output::flag(c.selectable, color),
                    reason: c.reason.clone().unwrap_or_default(),
                },
                |c| c.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use meshdeck_core::{EntityId, NodeStatus};

    use super::*;

    fn node() -> Node {
        Node {
            id: EntityId::from("0d4d8f8e-5b0a-4d43-9a52-0c6b1b5e3a11"),
            host_id: EntityId::from("5c1b7e2a-2f44-4a56-8d1c-7a3b9e0f6d22"),
            network: "office".into(),
            address: Some("10.101.0.2/32".parse().unwrap()),
            address6: None,
            connected: true,
            status: NodeStatus::Online,
            last_check_in: None,
            is_relay: false,
            relayed_nodes: Vec::new(),
            is_relayed: false,
            relayed_by: None,
            is_egress_gateway: false,
            egress_ranges: Vec::new(),
            egress_nat: false,
            is_ingress_gateway: false,
            ingress_dns: None,
            is_internet_gateway: false,
            internet_gateway_clients: Vec::new(),
            internet_gateway_id: None,
            tags: Vec::new(),
            pending_delete: false,
            expires_at: None,
        }
    }

    #[test]
    fn roles_lists_every_flag() {
        let mut n = node();
        assert_eq!(roles(&n), "-");
        n.is_relay = true;
        n.is_egress_gateway = true;
        assert_eq!(roles(&n), "relay, egress");
    }

    #[test]
    fn view_flattens_node_fields() {
        let ext = ExtendedNode {
            node: Arc::new(node()),
            host: None,
        };
        let json = serde_json::to_value(NodeView::from(&ext)).unwrap();
        assert_eq!(json["network"], "office");
        assert_eq!(json["name"], "0d4d8f8e-5b0a-4d43-9a52-0c6b1b5e3a11");
        assert_eq!(json["endpoint"], "");
    }
}
