//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod acls;
pub mod config_cmd;
pub mod dns;
pub mod enrollment_keys;
pub mod ext_clients;
pub mod gateways;
pub mod groups;
pub mod hosts;
pub mod login;
pub mod networks;
pub mod nodes;
pub mod relays;
pub mod roles;
pub mod server;
pub mod setup;
pub mod tags;
pub mod users;
pub mod util;

use tokio::sync::OnceCell;

use meshdeck_core::{Command as CoreCommand, CommandResult, Controller, CoreError};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// One CLI invocation's view of the server.
///
/// Connects on first use, so commands whose input fails local validation
/// never open a connection.
pub struct Session {
    controller: Controller,
    connected: OnceCell<()>,
}

impl Session {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            connected: OnceCell::new(),
        }
    }

    /// The controller, connected and loaded.
    pub async fn controller(&self) -> Result<&Controller, CliError> {
        self.connected
            .get_or_try_init(|| self.controller.connect())
            .await?;
        Ok(&self.controller)
    }

    /// Validate locally, then connect and run `cmd`.
    pub async fn execute(&self, cmd: CoreCommand) -> Result<CommandResult, CliError> {
        cmd.validate().map_err(CoreError::from)?;
        let controller = self.controller().await?;
        tracing::debug!(command = %cmd.describe(), "executing");
        Ok(controller.execute(cmd).await?)
    }

    pub async fn close(&self) {
        if self.connected.initialized() {
            self.controller.disconnect().await;
        }
    }
}

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Networks(args) => networks::handle(session, args, global).await,
        Command::Hosts(args) => hosts::handle(session, args, global).await,
        Command::Nodes(args) => nodes::handle(session, args, global).await,
        Command::Relays(args) => relays::handle(session, args, global).await,
        Command::Egress(args) => gateways::handle_egress(session, args, global).await,
        Command::Ingress(args) => gateways::handle_ingress(session, args, global).await,
        Command::InternetGateways(args) => {
            gateways::handle_internet(session, args, global).await
        }
        Command::ExtClients(args) => ext_clients::handle(session, args, global).await,
        Command::Users(args) => users::handle(session, args, global).await,
        Command::Groups(args) => groups::handle(session, args, global).await,
        Command::Roles(args) => roles::handle(session, args, global).await,
        Command::Acls(args) => acls::handle(session, args, global).await,
        Command::Tags(args) => tags::handle(session, args, global).await,
        Command::Dns(args) => dns::handle(session, args, global).await,
        Command::EnrollmentKeys(args) => enrollment_keys::handle(session, args, global).await,
        Command::Server(args) => server::handle(session, args, global).await,
        Command::Setup => setup::handle(session, global).await,
        // Handled before a session exists
        Command::Login(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Internal("command does not use a server session".into()))
        }
    }
}
