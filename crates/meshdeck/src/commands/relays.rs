//! Relay command handlers.

use tabled::Tabled;

use meshdeck_core::{Command as CoreCommand, Controller, ExtendedNode, NodeTarget};

use crate::cli::{GlobalOpts, NodeRef, RelaysArgs, RelaysCommand};
use crate::error::CliError;
use crate::output;

use super::nodes::{NodeView, list_nodes, node_name, views};
use super::{Session, util};

#[derive(Tabled)]
struct RelayRow {
    #[tabled(rename = "Relay")]
    name: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Relayed Nodes")]
    relayed: String,
}

fn row(v: &NodeView<'_>, controller: &Controller, color: bool) -> RelayRow {
    let n = v.node;
    let relayed: Vec<String> = n
        .relayed_nodes
        .iter()
        .map(|id| node_name(controller, &n.network, id))
        .collect();
    RelayRow {
        name: v.name.clone(),
        network: n.network.clone(),
        status: output::status(n.status, color),
        relayed: output::join(&relayed),
    }
}

pub async fn handle(session: &Session, args: RelaysArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        RelaysCommand::List(filter) => {
            let controller = session.controller().await?;
            let relays: Vec<ExtendedNode> = list_nodes(controller, filter.network.as_deref())
                .into_iter()
                .filter(|n| n.node.is_relay)
                .collect();
            let out = output::render_list(
                &global.output,
                &views(&relays),
                |v| row(v, controller, color),
                |v| v.node.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RelaysCommand::Create {
            target: NodeRef { network, node },
            relayed,
        } => {
            let controller = session.controller().await?;
            let relay = util::resolve_node_id(controller, &network, &node)?;
            let relayed = util::resolve_node_ids(controller, &network, &relayed)?;
            let count = relayed.len();
            session
                .execute(CoreCommand::CreateRelay {
                    network,
                    relay: NodeTarget::Node(relay),
                    relayed,
                })
                .await?;
            output::done(
                &format!("Node '{node}' now relays {count} node(s)"),
                global.quiet,
            );
            Ok(())
        }

        RelaysCommand::Set {
            target: NodeRef { network, node },
            relayed,
        } => {
            let controller = session.controller().await?;
            let relay = util::resolve_node_id(controller, &network, &node)?;
            let relayed = util::resolve_node_ids(controller, &network, &relayed)?;
            session
                .execute(CoreCommand::UpdateRelayedNodes {
                    network,
                    relay,
                    relayed,
                })
                .await?;
            output::done(&format!("Relayed nodes of '{node}' updated"), global.quiet);
            Ok(())
        }

        RelaysCommand::Move {
            target: NodeRef { network, node },
            from,
            to,
        } => {
            let controller = session.controller().await?;
            let node_id = util::resolve_node_id(controller, &network, &node)?;
            let from_id = util::resolve_node_id(controller, &network, &from)?;
            let to_id = util::resolve_node_id(controller, &network, &to)?;
            session
                .execute(CoreCommand::ReassignRelayedNode {
                    network,
                    node: node_id,
                    from: from_id,
                    to: to_id,
                })
                .await?;
            output::done(
                &format!("Node '{node}' moved from relay '{from}' to '{to}'"),
                global.quiet,
            );
            Ok(())
        }

        RelaysCommand::Delete(NodeRef { network, node }) => {
            let relay = util::resolve_node_id(session.controller().await?, &network, &node)?;
            let prompt = format!("Remove the relay on {node}? Its relayed nodes go direct.");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteRelay { network, relay })
                .await?;
            output::done(&format!("Relay on '{node}' removed"), global.quiet);
            Ok(())
        }
    }
}
