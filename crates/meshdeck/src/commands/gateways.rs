//! Egress, remote-access (ingress) and internet gateway handlers.

use tabled::Tabled;

use meshdeck_core::{
    Command as CoreCommand, Controller, CreateEgressRequest, CreateIngressRequest, ExtendedNode,
    Node, NodeTarget,
};

use crate::cli::{
    EgressArgs, EgressCommand, GlobalOpts, IngressArgs, IngressCommand, InternetGatewaysArgs,
    InternetGatewaysCommand, NetworkFilter, NodeRef,
};
use crate::error::CliError;
use crate::output;

use super::nodes::{NodeView, list_nodes, node_name, views};
use super::{Session, util};

#[derive(Tabled)]
struct GatewayRow {
    #[tabled(rename = "Gateway")]
    name: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Print the gateways of one kind, with a kind-specific detail column.
async fn list_gateways(
    session: &Session,
    filter: NetworkFilter,
    global: &GlobalOpts,
    is_kind: fn(&Node) -> bool,
    details: impl Fn(&Controller, &Node) -> String,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let controller = session.controller().await?;
    let gateways: Vec<ExtendedNode> = list_nodes(controller, filter.network.as_deref())
        .into_iter()
        .filter(|n| is_kind(&n.node))
        .collect();
    let out = output::render_list(
        &global.output,
        &views(&gateways),
        |v: &NodeView<'_>| GatewayRow {
            name: v.name.clone(),
            network: v.node.network.clone(),
            status: output::status(v.node.status, color),
            details: details(controller, v.node),
        },
        |v| v.node.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Egress ──────────────────────────────────────────────────────────

pub async fn handle_egress(
    session: &Session,
    args: EgressArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        EgressCommand::List(filter) => {
            list_gateways(
                session,
                filter,
                global,
                |n| n.is_egress_gateway,
                |_, n| {
                    let nat = if n.egress_nat { " (nat)" } else { "" };
                    format!("{}{nat}", output::join(&n.egress_ranges))
                },
            )
            .await
        }

        EgressCommand::Create {
            target: NodeRef { network, node },
            ranges,
            no_nat,
        } => {
            let request = CreateEgressRequest {
                ranges,
                nat: !no_nat,
            };
            request.validate().map_err(meshdeck_core::CoreError::from)?;
            let id = util::resolve_node_id(session.controller().await?, &network, &node)?;
            session
                .execute(CoreCommand::CreateEgress {
                    network,
                    node: NodeTarget::Node(id),
                    request,
                })
                .await?;
            output::done(&format!("Node '{node}' is now an egress gateway"), global.quiet);
            Ok(())
        }

        EgressCommand::Update {
            target: NodeRef { network, node },
            ranges,
        } => {
            if ranges.is_empty() {
                let prompt = format!("No ranges given. Remove egress from {node}?");
                if !util::confirm(&prompt, global.yes)? {
                    return Ok(());
                }
            }
            let id = util::resolve_node_id(session.controller().await?, &network, &node)?;
            session
                .execute(CoreCommand::UpdateEgressRanges {
                    network,
                    node: id,
                    ranges,
                })
                .await?;
            output::done(&format!("Egress ranges of '{node}' updated"), global.quiet);
            Ok(())
        }

        EgressCommand::Delete(NodeRef { network, node }) => {
            let id = util::resolve_node_id(session.controller().await?, &network, &node)?;
            let prompt = format!("Remove egress gateway from {node}?");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteEgress { network, node: id })
                .await?;
            output::done(&format!("Egress removed from '{node}'"), global.quiet);
            Ok(())
        }
    }
}

// ── Ingress (remote access) ─────────────────────────────────────────

pub async fn handle_ingress(
    session: &Session,
    args: IngressArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        IngressCommand::List(filter) => {
            list_gateways(
                session,
                filter,
                global,
                |n| n.is_ingress_gateway,
                |controller, n| {
                    let clients = controller
                        .store()
                        .ext_clients_in_network(&n.network)
                        .iter()
                        .filter(|c| c.gateway_id == n.id)
                        .count();
                    match n.ingress_dns {
                        Some(ref dns) => format!("{clients} client(s), dns {dns}"),
                        None => format!("{clients} client(s)"),
                    }
                },
            )
            .await
        }

        IngressCommand::Create {
            target: NodeRef { network, node },
            dns,
        } => {
            let request = CreateIngressRequest { dns };
            request.validate().map_err(meshdeck_core::CoreError::from)?;
            let id = util::resolve_node_id(session.controller().await?, &network, &node)?;
            session
                .execute(CoreCommand::CreateIngress {
                    network,
                    node: NodeTarget::Node(id),
                    request,
                })
                .await?;
            output::done(
                &format!("Node '{node}' is now a remote-access gateway"),
                global.quiet,
            );
            Ok(())
        }

        IngressCommand::Delete(NodeRef { network, node }) => {
            let id = util::resolve_node_id(session.controller().await?, &network, &node)?;
            let prompt =
                format!("Remove remote access from {node}? Its external clients are deleted.");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteIngress { network, node: id })
                .await?;
            output::done(&format!("Remote access removed from '{node}'"), global.quiet);
            Ok(())
        }
    }
}

// ── Internet gateways ───────────────────────────────────────────────

pub async fn handle_internet(
    session: &Session,
    args: InternetGatewaysArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        InternetGatewaysCommand::List(filter) => {
            list_gateways(
                session,
                filter,
                global,
                |n| n.is_internet_gateway,
                |controller, n| {
                    let clients: Vec<String> = n
                        .internet_gateway_clients
                        .iter()
                        .map(|id| node_name(controller, &n.network, id))
                        .collect();
                    output::join(&clients)
                },
            )
            .await
        }

        InternetGatewaysCommand::Create {
            target: NodeRef { network, node },
            clients,
        } => {
            let controller = session.controller().await?;
            let id = util::resolve_node_id(controller, &network, &node)?;
            let clients = util::resolve_node_ids(controller, &network, &clients)?;
            session
                .execute(CoreCommand::CreateInternetGateway {
                    network,
                    node: NodeTarget::Node(id),
                    clients,
                })
                .await?;
            output::done(
                &format!("Node '{node}' is now an internet gateway"),
                global.quiet,
            );
            Ok(())
        }

        InternetGatewaysCommand::Update {
            target: NodeRef { network, node },
            clients,
        } => {
            let controller = session.controller().await?;
            let id = util::resolve_node_id(controller, &network, &node)?;
            let clients = util::resolve_node_ids(controller, &network, &clients)?;
            session
                .execute(CoreCommand::UpdateInternetGateway {
                    network,
                    node: id,
                    clients,
                })
                .await?;
            output::done(
                &format!("Clients of internet gateway '{node}' updated"),
                global.quiet,
            );
            Ok(())
        }

        InternetGatewaysCommand::Delete(NodeRef { network, node }) => {
            let id = util::resolve_node_id(session.controller().await?, &network, &node)?;
            let prompt = format!("Remove internet gateway from {node}?");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteInternetGateway { network, node: id })
                .await?;
            output::done(
                &format!("Internet gateway removed from '{node}'"),
                global.quiet,
            );
            Ok(())
        }
    }
}
