//! ACL policy command handlers.

use std::sync::Arc;

use tabled::Tabled;

use meshdeck_core::{
    AclMember, AclRule, Command as CoreCommand, CommandResult, CreateAclRequest, EntityId,
    PolicyType, TrafficDirection, UpdateAclRequest,
};

use crate::cli::{AclType, AclsArgs, AclsCommand, Direction, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

#[derive(Tabled)]
struct AclRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Type")]
    policy_type: String,
    #[tabled(rename = "Sources")]
    sources: String,
    #[tabled(rename = "Destinations")]
    destinations: String,
    #[tabled(rename = "Dir")]
    direction: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

fn row(a: &Arc<AclRule>, color: bool) -> AclRow {
    AclRow {
        id: a.id.to_string(),
        name: a.name.clone(),
        network: a.network.clone(),
        policy_type: a.policy_type.to_string(),
        sources: output::join(&a.sources),
        destinations: output::join(&a.destinations),
        direction: arrow(a.direction).into(),
        enabled: output::flag(a.enabled, color),
    }
}

fn arrow(direction: TrafficDirection) -> &'static str {
    match direction {
        TrafficDirection::Uni => "→",
        TrafficDirection::Bi => "↔",
    }
}

fn detail(a: &AclRule, color: bool) -> String {
    let path = format!("/networks/{}/acls/{}", a.network, a.id);
    let mut lines = vec![
        output::context_line(&path, &[("network", a.network.as_str())], color),
        String::new(),
        format!("ID:           {}", a.id),
        format!("Name:         {}", a.name),
        format!("Network:      {}", a.network),
        format!("Type:         {}", a.policy_type),
        format!("Sources:      {}", output::join(&a.sources)),
        format!("Destinations: {}", output::join(&a.destinations)),
        format!("Direction:    {} ({})", a.direction, arrow(a.direction)),
        format!("Enabled:      {}", output::flag(a.enabled, color)),
        format!("Default:      {}", output::flag(a.is_default, color)),
    ];
    if !a.description.is_empty() {
        lines.push(format!("Description:  {}", a.description));
    }
    if !a.created_by.is_empty() {
        lines.push(format!("Created by:   {}", a.created_by));
    }
    lines.join("\n")
}

/// Parse `kind:value` members, naming the flag on failure.
fn parse_members(field: &str, raw: &[String]) -> Result<Vec<AclMember>, CliError> {
    raw.iter()
        .map(|s| {
            s.parse::<AclMember>().map_err(|reason| CliError::Validation {
                field: field.into(),
                reason,
            })
        })
        .collect()
}

fn direction(d: Direction) -> TrafficDirection {
    match d {
        Direction::Uni => TrafficDirection::Uni,
        Direction::Bi => TrafficDirection::Bi,
    }
}

pub async fn handle(session: &Session, args: AclsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        AclsCommand::List(filter) => {
            let controller = session.controller().await?;
            let acls = match filter.network {
                Some(ref net) => controller.store().acls_in_network(net),
                None => controller.acls_snapshot().as_ref().clone(),
            };
            let out = output::render_list(
                &global.output,
                &acls,
                |a| row(a, color),
                |a| a.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AclsCommand::Get { id } => {
            let controller = session.controller().await?;
            let a = controller
                .store()
                .acl_by_id(&EntityId::from(id.as_str()))
                .ok_or_else(|| CliError::not_found("ACL rule", &id, "acls list"))?;
            let out = output::render_single(
                &global.output,
                a.as_ref(),
                |a| detail(a, color),
                |a| a.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AclsCommand::Create {
            network,
            name,
            policy_type,
            sources,
            destinations,
            direction: dir,
            description,
            disabled,
        } => {
            let req = CreateAclRequest {
                network,
                name,
                policy_type: match policy_type {
                    AclType::User => PolicyType::User,
                    AclType::Device => PolicyType::Device,
                },
                sources: parse_members("src", &sources)?,
                destinations: parse_members("dst", &destinations)?,
                direction: direction(dir),
                enabled: !disabled,
                description,
            };
            let result = session.execute(CoreCommand::CreateAcl(req)).await?;
            if let CommandResult::AclRule(a) = result {
                output::done(
                    &format!("Policy '{}' created with id {}", a.name, a.id),
                    global.quiet,
                );
            }
            Ok(())
        }

        AclsCommand::Update {
            id,
            name,
            sources,
            destinations,
            direction: dir,
            description,
            enabled,
        } => {
            let update = UpdateAclRequest {
                name,
                sources: sources.map(|s| parse_members("src", &s)).transpose()?,
                destinations: destinations
                    .map(|d| parse_members("dst", &d))
                    .transpose()?,
                direction: dir.map(direction),
                enabled,
                description,
            };
            session
                .execute(CoreCommand::UpdateAcl {
                    id: EntityId::from(id.as_str()),
                    update,
                })
                .await?;
            output::done(&format!("Policy '{id}' updated"), global.quiet);
            Ok(())
        }

        AclsCommand::Delete { id } => {
            let prompt = format!("Delete policy {id}?");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteAcl {
                    id: EntityId::from(id.as_str()),
                })
                .await?;
            output::done(&format!("Policy '{id}' deleted"), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use meshdeck_core::AclMemberKind;

    use super::*;

    #[test]
    fn members_parse_kind_and_value() {
        let members =
            parse_members("src", &["tag:office.web".into(), "user-group:*".into()]).unwrap();
        assert_eq!(members[0].kind, AclMemberKind::Tag);
        assert_eq!(members[0].value, "office.web");
        assert!(members[1].is_wildcard());
    }

    #[test]
    fn bad_member_names_the_flag() {
        match parse_members("dst", &["printer".into()]).unwrap_err() {
            CliError::Validation { field, reason } => {
                assert_eq!(field, "dst");
                assert!(reason.contains("kind:value"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
