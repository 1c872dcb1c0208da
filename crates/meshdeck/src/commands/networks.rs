//! Network command handlers.

use std::sync::Arc;

use tabled::Tabled;

use meshdeck_core::{
    Command as CoreCommand, CommandResult, Controller, CreateNetworkRequest, DefaultAclPolicy,
    Network, UpdateNetworkRequest,
};

use crate::cli::{AclPolicy, GlobalOpts, NetworksArgs, NetworksCommand};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "Network")]
    name: String,
    #[tabled(rename = "IPv4")]
    ipv4: String,
    #[tabled(rename = "IPv6")]
    ipv6: String,
    #[tabled(rename = "Default ACL")]
    default_acl: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
}

fn row(n: &Arc<Network>, controller: &Controller) -> NetworkRow {
    let nodes = controller.store().nodes_in_network(&n.name).len();
    NetworkRow {
        name: n.name.clone(),
        ipv4: n.ipv4_range.map(|r| r.to_string()).unwrap_or_default(),
        ipv6: n.ipv6_range.map(|r| r.to_string()).unwrap_or_default(),
        default_acl: n.default_acl.to_string(),
        nodes,
    }
}

fn detail(n: &Network, color: bool) -> String {
    let path = format!("/networks/{}", n.name);
    let mut lines = vec![
        output::context_line(&path, &[("network", n.name.as_str())], color),
        String::new(),
        format!("Network:      {}", n.name),
        format!(
            "IPv4 range:   {}",
            n.ipv4_range.map_or_else(|| "-".into(), |r| r.to_string())
        ),
        format!(
            "IPv6 range:   {}",
            n.ipv6_range.map_or_else(|| "-".into(), |r| r.to_string())
        ),
        format!("Default ACL:  {}", n.default_acl),
        format!("Nameservers:  {}", output::join(&n.nameservers)),
        format!("Keepalive:    {}s", n.default_keepalive),
        format!("MTU:          {}", n.default_mtu),
    ];
    if let Some(modified) = n.network_last_modified {
        lines.push(format!("Modified:     {modified}"));
    }
    if let Some(ref pro) = n.pro_settings {
        lines.push(format!("Access level: {}", pro.default_access_level));
        lines.push(format!("Allowed users:  {}", output::join(&pro.allowed_users)));
        lines.push(format!("Allowed groups: {}", output::join(&pro.allowed_groups)));
    }
    lines.join("\n")
}

fn acl_policy(p: AclPolicy) -> DefaultAclPolicy {
    match p {
        AclPolicy::Allow => DefaultAclPolicy::Allow,
        AclPolicy::Deny => DefaultAclPolicy::Deny,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: NetworksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        NetworksCommand::List => {
            let controller = session.controller().await?;
            let snap = controller.networks_snapshot();
            let out = output::render_list(
                &global.output,
                &snap,
                |n| row(n, controller),
                |n| n.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NetworksCommand::Get { network } => {
            let controller = session.controller().await?;
            let n = controller
                .store()
                .network(&network)
                .ok_or_else(|| CliError::not_found("network", &network, "networks list"))?;
            let out = output::render_single(
                &global.output,
                n.as_ref(),
                |n| detail(n, color),
                |n| n.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NetworksCommand::Create {
            name,
            ipv4,
            ipv6,
            default_acl,
            nameservers,
            keepalive,
            mtu,
            from_file,
        } => {
            let req = match from_file {
                Some(ref path) => util::read_json_file(path)?,
                None => CreateNetworkRequest {
                    name: name.unwrap_or_default(),
                    ipv4_range: ipv4,
                    ipv6_range: ipv6,
                    default_acl: default_acl.map(acl_policy).unwrap_or_default(),
                    nameservers,
                    default_keepalive: keepalive,
                    default_mtu: mtu,
                },
            };

            let result = session.execute(CoreCommand::CreateNetwork(req)).await?;
            if let CommandResult::Network(n) = result {
                output::done(&format!("Network '{}' created", n.name), global.quiet);
            }
            Ok(())
        }

        NetworksCommand::Update {
            network,
            ipv4,
            ipv6,
            default_acl,
            nameservers,
            keepalive,
            mtu,
            from_file,
        } => {
            let update = match from_file {
                Some(ref path) => util::read_json_file(path)?,
                None => UpdateNetworkRequest {
                    ipv4_range: ipv4,
                    ipv6_range: ipv6,
                    default_acl: default_acl.map(acl_policy),
                    nameservers,
                    default_keepalive: keepalive,
                    default_mtu: mtu,
                },
            };

            session
                .execute(CoreCommand::UpdateNetwork {
                    network: network.clone(),
                    update,
                })
                .await?;
            output::done(&format!("Network '{network}' updated"), global.quiet);
            Ok(())
        }

        NetworksCommand::Delete { network } => {
            let prompt = format!("Delete network {network} and all of its nodes?");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteNetwork {
                    network: network.clone(),
                })
                .await?;
            output::done(&format!("Network '{network}' deleted"), global.quiet);
            Ok(())
        }
    }
}
