//! Tag command handlers.

use std::sync::Arc;

use tabled::Tabled;

use meshdeck_core::{
    Command as CoreCommand, CommandResult, Controller, CreateTagRequest, EntityId, Tag,
    UpdateTagRequest,
};

use crate::cli::{GlobalOpts, TagsArgs, TagsCommand};
use crate::error::CliError;
use crate::output;

use super::nodes::node_name;
use super::{Session, util};

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "Tag")]
    name: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Nodes")]
    nodes: String,
    #[tabled(rename = "Used By")]
    used_by: u32,
}

fn row(t: &Arc<Tag>, controller: &Controller) -> TagRow {
    let nodes: Vec<String> = t
        .tagged_nodes
        .iter()
        .map(|id| node_name(controller, &t.network, id))
        .collect();
    TagRow {
        name: t.name.clone(),
        network: t.network.clone(),
        nodes: output::join(&nodes),
        used_by: t.used_by_count,
    }
}

/// The tag's network, needed to resolve node names on update.
fn tag_network(controller: &Controller, id: &str) -> Result<String, CliError> {
    controller
        .store()
        .tag_by_id(&EntityId::from(id))
        .map(|t| t.network.clone())
        .ok_or_else(|| CliError::not_found("tag", id, "tags list"))
}

pub async fn handle(session: &Session, args: TagsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        TagsCommand::List(filter) => {
            let controller = session.controller().await?;
            let tags = match filter.network {
                Some(ref net) => controller.store().tags_in_network(net),
                None => controller.tags_snapshot().as_ref().clone(),
            };
            let out = output::render_list(
                &global.output,
                &tags,
                |t| row(t, controller),
                |t| t.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TagsCommand::Create {
            network,
            name,
            nodes,
        } => {
            let nodes = if nodes.is_empty() {
                Vec::new()
            } else {
                util::resolve_node_ids(session.controller().await?, &network, &nodes)?
            };
            let req = CreateTagRequest {
                network,
                name,
                nodes,
            };
            let result = session.execute(CoreCommand::CreateTag(req)).await?;
            if let CommandResult::Tag(t) = result {
                output::done(&format!("Tag '{}' created", t.id), global.quiet);
            }
            Ok(())
        }

        TagsCommand::Update { id, rename, nodes } => {
            let nodes = match nodes {
                Some(idents) => {
                    let controller = session.controller().await?;
                    let network = tag_network(controller, &id)?;
                    Some(util::resolve_node_ids(controller, &network, &idents)?)
                }
                None => None,
            };
            let update = UpdateTagRequest {
                new_name: rename,
                nodes,
            };
            session
                .execute(CoreCommand::UpdateTag {
                    id: EntityId::from(id.as_str()),
                    update,
                })
                .await?;
            output::done(&format!("Tag '{id}' updated"), global.quiet);
            Ok(())
        }

        TagsCommand::Delete { id } => {
            let prompt = format!("Delete tag {id}? Policies using it stop matching.");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteTag {
                    id: EntityId::from(id.as_str()),
                })
                .await?;
            output::done(&format!("Tag '{id}' deleted"), global.quiet);
            Ok(())
        }
    }
}
