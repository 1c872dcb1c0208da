// External (remote-access) client endpoints
//
// Clients hang off an ingress gateway; the config endpoint returns the
// WireGuard config text a user imports on their device.

use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::{ExtClientRequest, ExtClientResponse};

impl RestClient {
    /// `GET /api/extclients`
    pub async fn list_ext_clients(&self) -> Result<Vec<ExtClientResponse>, Error> {
        let clients: Option<Vec<ExtClientResponse>> = self.get(&["api", "extclients"]).await?;
        Ok(clients.unwrap_or_default())
    }

    /// `GET /api/extclients/{net}`
    pub async fn list_network_ext_clients(
        &self,
        netid: &str,
    ) -> Result<Vec<ExtClientResponse>, Error> {
        let clients: Option<Vec<ExtClientResponse>> =
            self.get(&["api", "extclients", netid]).await?;
        Ok(clients.unwrap_or_default())
    }

    /// `GET /api/extclients/{net}/{id}`
    pub async fn get_ext_client(
        &self,
        netid: &str,
        client_id: &str,
    ) -> Result<ExtClientResponse, Error> {
        self.get(&["api", "extclients", netid, client_id]).await
    }

    /// `POST /api/extclients/{net}/{gw}`
    ///
    /// The server answers with a bare success status, so callers re-fetch
    /// the network's clients to obtain the created record.
    pub async fn create_ext_client(
        &self,
        netid: &str,
        gateway_id: &str,
        request: &ExtClientRequest,
    ) -> Result<(), Error> {
        debug!(netid, gateway_id, "creating external client");
        self.post_no_response(&["api", "extclients", netid, gateway_id], request)
            .await
    }

    /// `PUT /api/extclients/{net}/{id}`
    pub async fn update_ext_client(
        &self,
        netid: &str,
        client_id: &str,
        request: &ExtClientRequest,
    ) -> Result<ExtClientResponse, Error> {
        debug!(netid, client_id, "updating external client");
        self.put(&["api", "extclients", netid, client_id], request)
            .await
    }

    /// `DELETE /api/extclients/{net}/{id}`
    pub async fn delete_ext_client(&self, netid: &str, client_id: &str) -> Result<(), Error> {
        debug!(netid, client_id, "deleting external client");
        self.delete(&["api", "extclients", netid, client_id]).await
    }

    /// `GET /api/extclients/{net}/{id}/file`
    pub async fn get_ext_client_config(
        &self,
        netid: &str,
        client_id: &str,
    ) -> Result<String, Error> {
        self.get_text(&["api", "extclients", netid, client_id, "file"])
            .await
    }
}
