//! DNS entry command handlers.

use std::sync::Arc;

use tabled::Tabled;

use meshdeck_core::{Command as CoreCommand, CreateDnsEntryRequest, DnsEntry};

use crate::cli::{DnsArgs, DnsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

#[derive(Tabled)]
struct DnsRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "IPv4")]
    address: String,
    #[tabled(rename = "IPv6")]
    address6: String,
}

fn row(d: &Arc<DnsEntry>) -> DnsRow {
    DnsRow {
        name: d.name.clone(),
        network: d.network.clone(),
        address: d.address.map(|a| a.to_string()).unwrap_or_default(),
        address6: d.address6.map(|a| a.to_string()).unwrap_or_default(),
    }
}

pub async fn handle(session: &Session, args: DnsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DnsCommand::List(filter) => {
            let controller = session.controller().await?;
            let entries = match filter.network {
                Some(ref net) => controller.store().dns_in_network(net),
                None => controller.dns_entries_snapshot().as_ref().clone(),
            };
            let out = output::render_list(&global.output, &entries, row, |d| d.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DnsCommand::Create {
            network,
            name,
            address,
            address6,
        } => {
            let req = CreateDnsEntryRequest {
                network: network.clone(),
                name: name.clone(),
                address,
                address6,
            };
            session.execute(CoreCommand::CreateDnsEntry(req)).await?;
            output::done(&format!("DNS entry '{name}' added to '{network}'"), global.quiet);
            Ok(())
        }

        DnsCommand::Delete { network, name } => {
            let prompt = format!("Delete DNS entry {name} from {network}?");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteDnsEntry {
                    network: network.clone(),
                    name: name.clone(),
                })
                .await?;
            output::done(&format!("DNS entry '{name}' deleted"), global.quiet);
            Ok(())
        }
    }
}
