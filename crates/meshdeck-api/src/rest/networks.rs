// Network endpoints

use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::NetworkResponse;

impl RestClient {
    /// `GET /api/networks`
    pub async fn list_networks(&self) -> Result<Vec<NetworkResponse>, Error> {
        let networks: Option<Vec<NetworkResponse>> = self.get(&["api", "networks"]).await?;
        Ok(networks.unwrap_or_default())
    }

    /// `GET /api/networks/{net}`
    pub async fn get_network(&self, netid: &str) -> Result<NetworkResponse, Error> {
        self.get(&["api", "networks", netid]).await
    }

    /// `POST /api/networks`
    pub async fn create_network(&self, network: &NetworkResponse) -> Result<NetworkResponse, Error> {
        debug!(netid = %network.netid, "creating network");
        self.post(&["api", "networks"], network).await
    }

    /// `PUT /api/networks/{net}`
    pub async fn update_network(&self, network: &NetworkResponse) -> Result<NetworkResponse, Error> {
        debug!(netid = %network.netid, "updating network");
        self.put(&["api", "networks", &network.netid], network).await
    }

    /// `DELETE /api/networks/{net}`
    pub async fn delete_network(&self, netid: &str) -> Result<(), Error> {
        debug!(netid, "deleting network");
        self.delete(&["api", "networks", netid]).await
    }
}
