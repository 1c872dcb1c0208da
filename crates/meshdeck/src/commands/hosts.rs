//! Host command handlers.

use std::sync::Arc;

use tabled::Tabled;

use meshdeck_core::{Command as CoreCommand, CommandResult, Controller, Host, UpdateHostRequest};

use crate::cli::{GlobalOpts, HostsArgs, HostsCommand};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

#[derive(Tabled)]
struct HostRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "OS")]
    os: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "NAT")]
    nat: String,
    #[tabled(rename = "Networks")]
    networks: usize,
}

fn row(h: &Arc<Host>) -> HostRow {
    HostRow {
        name: h.name.clone(),
        os: h.os.clone(),
        version: h.version.clone(),
        endpoint: h
            .endpoint_ip
            .map(|ip| format!("{ip}:{}", h.listen_port))
            .unwrap_or_default(),
        nat: h.nat_type.map(|n| n.to_string()).unwrap_or_default(),
        networks: h.node_ids.len(),
    }
}

/// Networks the host has a node in.
fn networks_of(host: &Host, controller: &Controller) -> Vec<String> {
    host.node_ids
        .iter()
        .filter_map(|id| controller.store().node_by_id(id))
        .map(|n| n.network.clone())
        .collect()
}

fn detail(h: &Host, networks: &[String], color: bool) -> String {
    let mut lines = vec![
        format!("ID:          {}", h.id),
        format!("Name:        {}", h.name),
        format!("OS:          {}", h.os),
        format!("Version:     {}", h.version),
        format!(
            "Endpoint:    {}",
            h.endpoint_ip.map_or_else(|| "-".into(), |ip| ip.to_string())
        ),
        format!("Listen port: {}", h.listen_port),
        format!("MTU:         {}", h.mtu),
        format!("Keepalive:   {}s", h.persistent_keepalive),
        format!(
            "NAT:         {}",
            h.nat_type.map_or_else(|| "-".into(), |n| n.to_string())
        ),
        format!("Default:     {}", output::flag(h.is_default, color)),
        format!("Static:      {}", output::flag(h.is_static, color)),
        format!("Networks:    {}", output::join(networks)),
        format!("Public key:  {}", h.public_key),
    ];
    if let Some(ip6) = h.endpoint_ipv6 {
        lines.insert(5, format!("Endpoint v6: {ip6}"));
    }
    if let Some(ref mac) = h.mac {
        lines.push(format!("MAC:         {mac}"));
    }
    lines.join("\n")
}

pub async fn handle(session: &Session, args: HostsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        HostsCommand::List => {
            let controller = session.controller().await?;
            let snap = controller.hosts_snapshot();
            let out = output::render_list(&global.output, &snap, row, |h| h.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        HostsCommand::Get { host } => {
            let controller = session.controller().await?;
            let h = controller
                .store()
                .resolve_host(&host)
                .ok_or_else(|| CliError::not_found("host", &host, "hosts list"))?;
            let networks = networks_of(&h, controller);
            let out = output::render_single(
                &global.output,
                h.as_ref(),
                |h| detail(h, &networks, color),
                |h| h.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        HostsCommand::Update {
            host,
            name,
            listen_port,
            mtu,
            keepalive,
            default,
            is_static,
            endpoint_ip,
        } => {
            let update = UpdateHostRequest {
                name,
                listen_port,
                mtu,
                persistent_keepalive: keepalive,
                is_default: default,
                is_static,
                endpoint_ip,
            };
            update.validate().map_err(meshdeck_core::CoreError::from)?;

            let id = util::resolve_host_id(session.controller().await?, &host)?;
            let result = session.execute(CoreCommand::UpdateHost { id, update }).await?;
            if let CommandResult::Host(h) = result {
                output::done(&format!("Host '{}' updated", h.name), global.quiet);
            }
            Ok(())
        }

        HostsCommand::Delete { host } => {
            let id = util::resolve_host_id(session.controller().await?, &host)?;
            let prompt = format!("Delete host {host}? It leaves every network it is in.");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session.execute(CoreCommand::DeleteHost { id }).await?;
            output::done(&format!("Host '{host}' deleted"), global.quiet);
            Ok(())
        }

        HostsCommand::Join { host, network } => {
            let id = util::resolve_host_id(session.controller().await?, &host)?;
            session
                .execute(CoreCommand::AddHostToNetwork {
                    host: id,
                    network: network.clone(),
                })
                .await?;
            output::done(&format!("Host '{host}' joined '{network}'"), global.quiet);
            Ok(())
        }

        HostsCommand::Leave { host, network } => {
            let id = util::resolve_host_id(session.controller().await?, &host)?;
            let prompt = format!("Remove host {host} from network {network}?");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::RemoveHostFromNetwork {
                    host: id,
                    network: network.clone(),
                })
                .await?;
            output::done(&format!("Host '{host}' left '{network}'"), global.quiet);
            Ok(())
        }
    }
}
