//! External (remote-access) client handlers.

use std::sync::Arc;

use tabled::Tabled;

use meshdeck_core::{
    Command as CoreCommand, CommandResult, Controller, CreateExtClientRequest, ExtClient,
    UpdateExtClientRequest,
};

use crate::cli::{ExtClientsArgs, ExtClientsCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::nodes::node_name;
use super::{Session, util};

#[derive(Tabled)]
struct ExtClientRow {
    #[tabled(rename = "Client")]
    name: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Gateway")]
    gateway: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Owner")]
    owner: String,
}

fn row(c: &Arc<ExtClient>, controller: &Controller, color: bool) -> ExtClientRow {
    ExtClientRow {
        name: c.name.clone(),
        network: c.network.clone(),
        address: c.address.map(|a| a.to_string()).unwrap_or_default(),
        gateway: node_name(controller, &c.network, &c.gateway_id),
        enabled: output::flag(c.enabled, color),
        owner: c.owner.clone().unwrap_or_default(),
    }
}

fn detail(c: &ExtClient, gateway: &str, color: bool) -> String {
    let path = format!("/networks/{}/remote-access/{}", c.network, c.name);
    [
        output::context_line(&path, &[("network", c.network.as_str())], color),
        String::new(),
        format!("Client:      {}", c.name),
        format!("Network:     {}", c.network),
        format!("Gateway:     {gateway} ({})", c.gateway_endpoint),
        format!(
            "Address:     {}",
            c.address.map_or_else(|| "-".into(), |a| a.to_string())
        ),
        format!(
            "Address v6:  {}",
            c.address6.map_or_else(|| "-".into(), |a| a.to_string())
        ),
        format!("DNS:         {}", c.dns.as_deref().unwrap_or("-")),
        format!("Allowed IPs: {}", output::join(&c.extra_allowed_ips)),
        format!("Enabled:     {}", output::flag(c.enabled, color)),
        format!("Owner:       {}", c.owner.as_deref().unwrap_or("-")),
        format!("Public key:  {}", c.public_key),
    ]
    .join("\n")
}

fn lookup(controller: &Controller, network: &str, client: &str) -> Result<Arc<ExtClient>, CliError> {
    controller.store().ext_client(network, client).ok_or_else(|| {
        CliError::not_found(
            "external client",
            client,
            format!("ext-clients list --network {network}"),
        )
    })
}

pub async fn handle(
    session: &Session,
    args: ExtClientsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        ExtClientsCommand::List(filter) => {
            let controller = session.controller().await?;
            let clients = match filter.network {
                Some(ref net) => controller.store().ext_clients_in_network(net),
                None => controller.ext_clients_snapshot().as_ref().clone(),
            };
            let out = output::render_list(
                &global.output,
                &clients,
                |c| row(c, controller, color),
                |c| c.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ExtClientsCommand::Get { network, client } => {
            let controller = session.controller().await?;
            let c = lookup(controller, &network, &client)?;
            let gateway = node_name(controller, &c.network, &c.gateway_id);
            let out = output::render_single(
                &global.output,
                c.as_ref(),
                |c| detail(c, &gateway, color),
                |c| c.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ExtClientsCommand::Create {
            network,
            gateway,
            client_id,
            public_key,
            dns,
            extra_allowed_ips,
            disabled,
        } => {
            let mut request = CreateExtClientRequest {
                gateway: gateway.as_str().into(),
                client_id,
                public_key,
                dns,
                extra_allowed_ips,
                enabled: !disabled,
            };
            request.validate().map_err(meshdeck_core::CoreError::from)?;
            let controller = session.controller().await?;
            request.gateway = util::resolve_node_id(controller, &network, &gateway)?;

            let result = session
                .execute(CoreCommand::CreateExtClient { network, request })
                .await?;
            if let CommandResult::ExtClient(c) = result {
                output::done(&format!("External client '{}' created", c.name), global.quiet);
                if matches!(global.output, OutputFormat::Plain) {
                    output::print_output(&c.name, global.quiet);
                }
            }
            Ok(())
        }

        ExtClientsCommand::Update {
            network,
            client,
            rename,
            public_key,
            dns,
            extra_allowed_ips,
        } => {
            let update = UpdateExtClientRequest {
                new_client_id: rename,
                public_key,
                dns,
                extra_allowed_ips,
                enabled: None,
            };
            session
                .execute(CoreCommand::UpdateExtClient {
                    network,
                    client_id: client.clone(),
                    update,
                })
                .await?;
            output::done(&format!("External client '{client}' updated"), global.quiet);
            Ok(())
        }

        ExtClientsCommand::Enable { network, client } => {
            set_enabled(session, network, client, true, global).await
        }

        ExtClientsCommand::Disable { network, client } => {
            set_enabled(session, network, client, false, global).await
        }

        ExtClientsCommand::Delete { network, client } => {
            let prompt = format!("Delete external client {client}? Its config stops working.");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteExtClient {
                    network,
                    client_id: client.clone(),
                })
                .await?;
            output::done(&format!("External client '{client}' deleted"), global.quiet);
            Ok(())
        }

        ExtClientsCommand::Config {
            network,
            client,
            out,
        } => {
            let controller = session.controller().await?;
            let config = controller.ext_client_config(&network, &client).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, config)?;
                    output::done(
                        &format!("Config for '{client}' written to {}", path.display()),
                        global.quiet,
                    );
                }
                None => output::print_output(config.trim_end(), global.quiet),
            }
            Ok(())
        }
    }
}

async fn set_enabled(
    session: &Session,
    network: String,
    client: String,
    enabled: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    session
        .execute(CoreCommand::SetExtClientEnabled {
            network,
            client_id: client.clone(),
            enabled,
        })
        .await?;
    let state = if enabled { "enabled" } else { "disabled" };
    output::done(&format!("External client '{client}' {state}"), global.quiet);
    Ok(())
}
