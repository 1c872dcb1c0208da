//! User group command handlers.

use std::sync::Arc;

use tabled::Tabled;

use meshdeck_core::{
    Command as CoreCommand, CommandResult, CreateUserGroupRequest, EntityId,
    UpdateUserGroupRequest, UserGroup,
};

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Network Roles")]
    networks: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn row(g: &Arc<UserGroup>) -> GroupRow {
    let networks: Vec<String> = g
        .network_roles
        .iter()
        .map(|(net, roles)| format!("{net} ({})", roles.join(", ")))
        .collect();
    GroupRow {
        id: g.id.to_string(),
        name: g.name.clone(),
        networks: output::join(&networks),
        description: g.description.clone(),
    }
}

pub async fn handle(session: &Session, args: GroupsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        GroupsCommand::List => {
            let controller = session.controller().await?;
            let snap = controller.user_groups_snapshot();
            let out = output::render_list(&global.output, &snap, row, |g| g.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::Create {
            name,
            description,
            network_roles,
            members,
        } => {
            let req = CreateUserGroupRequest {
                name,
                description,
                network_roles: util::parse_role_map(&network_roles)?,
                members,
            };
            let result = session.execute(CoreCommand::CreateUserGroup(req)).await?;
            if let CommandResult::UserGroup(g) = result {
                output::done(
                    &format!("Group '{}' created with id {}", g.name, g.id),
                    global.quiet,
                );
            }
            Ok(())
        }

        GroupsCommand::Update {
            id,
            description,
            network_roles,
        } => {
            let update = UpdateUserGroupRequest {
                description,
                network_roles: network_roles
                    .map(|pairs| util::parse_role_map(&pairs))
                    .transpose()?,
            };
            session
                .execute(CoreCommand::UpdateUserGroup {
                    id: EntityId::from(id.as_str()),
                    update,
                })
                .await?;
            output::done(&format!("Group '{id}' updated"), global.quiet);
            Ok(())
        }

        GroupsCommand::Delete { id } => {
            let prompt = format!("Delete group {id}? Members lose its network roles.");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteUserGroup {
                    id: EntityId::from(id.as_str()),
                })
                .await?;
            output::done(&format!("Group '{id}' deleted"), global.quiet);
            Ok(())
        }
    }
}
