use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::{ServerConfigResponse, ServerStatusResponse};

impl RestClient {
    /// `GET /api/server/getconfig`
    pub async fn get_server_config(&self) -> Result<ServerConfigResponse, Error> {
        self.get(&["api", "server", "getconfig"]).await
    }

    /// `GET /api/server/status`
    pub async fn get_server_status(&self) -> Result<ServerStatusResponse, Error> {
        self.get(&["api", "server", "status"]).await
    }
}
