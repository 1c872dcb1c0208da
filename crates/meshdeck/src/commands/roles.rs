//! Role catalogue listing (read-only).

use std::sync::Arc;

use tabled::Tabled;

use meshdeck_core::UserRole;

use crate::cli::{GlobalOpts, RolesArgs};
use crate::error::CliError;
use crate::output;

use super::Session;

#[derive(Tabled)]
struct RoleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Full Access")]
    full_access: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn keep(role: &UserRole, args: &RolesArgs) -> bool {
    match (args.platform, args.network.as_deref()) {
        (true, _) => role.network.is_none(),
        (false, Some(net)) => role.network.as_deref() == Some(net),
        (false, None) => true,
    }
}

pub async fn handle(session: &Session, args: RolesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let controller = session.controller().await?;
    let roles: Vec<Arc<UserRole>> = controller
        .user_roles_snapshot()
        .iter()
        .filter(|r| keep(r, &args))
        .cloned()
        .collect();

    let out = output::render_list(
        &global.output,
        &roles,
        |r| RoleRow {
            id: r.id.to_string(),
            scope: r.network.clone().unwrap_or_else(|| "platform".into()),
            full_access: output::flag(r.full_access, color),
            default: output::flag(r.is_default, color),
            description: r.description.clone(),
        },
        |r| r.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use meshdeck_core::EntityId;

    use super::*;
    use crate::cli::{Cli, Command};

    fn role(network: Option<&str>) -> UserRole {
        UserRole {
            id: EntityId::from("network-admin"),
            name: "Network Admin".into(),
            network: network.map(Into::into),
            is_default: true,
            full_access: true,
            deny_dashboard_access: false,
            description: String::new(),
        }
    }

    fn args(argv: &[&str]) -> RolesArgs {
        let mut full = vec!["meshdeck", "roles"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Roles(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn platform_filter_keeps_unscoped_roles() {
        let a = args(&["--platform"]);
        assert!(keep(&role(None), &a));
        assert!(!keep(&role(Some("office")), &a));
    }

    #[test]
    fn network_filter_matches_scope() {
        let a = args(&["--network", "office"]);
        assert!(keep(&role(Some("office")), &a));
        assert!(!keep(&role(Some("lab")), &a));
        assert!(!keep(&role(None), &a));
        assert!(keep(&role(None), &args(&[])));
    }
}
