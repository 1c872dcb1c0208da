//! User command handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tabled::Tabled;

use meshdeck_core::format::relative_age;
use meshdeck_core::{
    Command as CoreCommand, CommandResult, CreateUserRequest, PlatformRole, UpdateUserRequest,
    User,
};

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Auth")]
    auth: String,
    #[tabled(rename = "Groups")]
    groups: String,
    #[tabled(rename = "Last Login")]
    last_login: String,
}

fn row(u: &Arc<User>) -> UserRow {
    UserRow {
        username: u.username.clone(),
        role: u.platform_role.to_string(),
        auth: u.auth_type.to_string(),
        groups: output::join(&u.groups),
        last_login: relative_age(u.last_login, Utc::now()),
    }
}

/// `office: network-admin, network-user` lines, one per network.
fn role_lines(roles: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    roles
        .iter()
        .map(|(network, ids)| format!("  {network}: {}", ids.join(", ")))
        .collect()
}

fn detail(u: &User, color: bool) -> String {
    let mut lines = vec![
        format!("Username:   {}", u.username),
        format!("Role:       {}", u.platform_role),
        format!("Admin:      {}", output::flag(u.is_admin, color)),
        format!("Auth:       {}", u.auth_type),
        format!("Groups:     {}", output::join(&u.groups)),
        format!("Last login: {}", relative_age(u.last_login, Utc::now())),
    ];
    if !u.network_roles.is_empty() {
        lines.push("Network roles:".into());
        lines.extend(role_lines(&u.network_roles));
    }
    lines.join("\n")
}

pub async fn handle(session: &Session, args: UsersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        UsersCommand::List => {
            let controller = session.controller().await?;
            let snap = controller.users_snapshot();
            let out = output::render_list(&global.output, &snap, row, |u| u.username.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Get { username } => {
            let controller = session.controller().await?;
            let u = controller
                .store()
                .user(&username)
                .ok_or_else(|| CliError::not_found("user", &username, "users list"))?;
            let out = output::render_single(
                &global.output,
                u.as_ref(),
                |u| detail(u, color),
                |u| u.username.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Create {
            username,
            role,
            network_roles,
            groups,
        } => {
            let network_roles = util::parse_role_map(&network_roles)?;
            let password = util::prompt_new_password()?;
            let req = CreateUserRequest {
                username,
                password,
                platform_role: PlatformRole::from(role),
                network_roles,
                groups,
            };
            let result = session.execute(CoreCommand::CreateUser(req)).await?;
            if let CommandResult::User(u) = result {
                output::done(&format!("User '{}' created", u.username), global.quiet);
            }
            Ok(())
        }

        UsersCommand::Update {
            username,
            role,
            network_roles,
            groups,
            password,
        } => {
            let network_roles = network_roles
                .map(|pairs| util::parse_role_map(&pairs))
                .transpose()?;
            let password = if password {
                Some(util::prompt_new_password()?)
            } else {
                None
            };
            let update = UpdateUserRequest {
                password,
                platform_role: role.map(PlatformRole::from),
                network_roles,
                groups,
            };
            session
                .execute(CoreCommand::UpdateUser {
                    username: username.clone(),
                    update,
                })
                .await?;
            output::done(&format!("User '{username}' updated"), global.quiet);
            Ok(())
        }

        UsersCommand::Delete { username } => {
            let prompt = format!("Delete user {username}?");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteUser {
                    username: username.clone(),
                })
                .await?;
            output::done(&format!("User '{username}' deleted"), global.quiet);
            Ok(())
        }
    }
}
