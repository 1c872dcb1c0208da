//! Server status.

use serde::Serialize;

use meshdeck_core::format::time_min_hrs;
use meshdeck_core::{Controller, ServerInfo};

use crate::cli::{GlobalOpts, ServerArgs, ServerCommand};
use crate::error::CliError;
use crate::output;

use super::Session;

#[derive(Serialize)]
struct ServerStatus {
    server: String,
    #[serde(flatten)]
    info: Option<ServerInfo>,
    networks: usize,
    hosts: usize,
    nodes: usize,
}

fn status(controller: &Controller) -> ServerStatus {
    let store = controller.store();
    ServerStatus {
        server: controller.config().url.to_string(),
        info: controller.server_info().map(|i| i.as_ref().clone()),
        networks: store.network_count(),
        hosts: store.host_count(),
        nodes: store.node_count(),
    }
}

fn health(value: Option<bool>, color: bool) -> String {
    value.map_or_else(|| "unknown".into(), |ok| output::flag(ok, color))
}

fn detail(s: &ServerStatus, color: bool) -> String {
    let mut lines = vec![format!("Server:     {}", s.server)];
    if let Some(ref info) = s.info {
        let edition = if info.is_pro { "pro" } else { "community" };
        lines.push(format!("Version:    {} ({edition})", info.version));
        lines.push(format!(
            "Sessions:   {}",
            time_min_hrs(info.session_validity_ns)
        ));
        if !info.default_domain.is_empty() {
            lines.push(format!("Domain:     {}", info.default_domain));
        }
        lines.push(format!("Database:   {}", health(info.db_connected, color)));
        lines.push(format!("Broker:     {}", health(info.broker_connected, color)));
    }
    lines.push(format!(
        "Inventory:  {} network(s), {} host(s), {} node(s)",
        s.networks, s.hosts, s.nodes
    ));
    lines.join("\n")
}

pub async fn handle(session: &Session, args: ServerArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        ServerCommand::Info => {
            let controller = session.controller().await?;
            let out = output::render_single(
                &global.output,
                &status(controller),
                |s| detail(s, color),
                |s| s.server.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
