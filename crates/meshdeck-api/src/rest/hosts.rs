// Host endpoints
//
// Hosts are machines running the agent; joining a host to a network
// creates a node for it there.

use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::HostResponse;

impl RestClient {
    /// `GET /api/hosts`
    pub async fn list_hosts(&self) -> Result<Vec<HostResponse>, Error> {
        let hosts: Option<Vec<HostResponse>> = self.get(&["api", "hosts"]).await?;
        Ok(hosts.unwrap_or_default())
    }

    /// `PUT /api/hosts/{id}`
    pub async fn update_host(&self, host: &HostResponse) -> Result<HostResponse, Error> {
        debug!(host_id = %host.id, "updating host");
        self.put(&["api", "hosts", &host.id], host).await
    }

    /// `DELETE /api/hosts/{id}`
    pub async fn delete_host(&self, host_id: &str) -> Result<(), Error> {
        debug!(host_id, "deleting host");
        self.delete(&["api", "hosts", host_id]).await
    }

    /// `POST /api/hosts/{id}/networks/{net}`
    pub async fn add_host_to_network(&self, host_id: &str, netid: &str) -> Result<(), Error> {
        debug!(host_id, netid, "adding host to network");
        self.post_no_response(&["api", "hosts", host_id, "networks", netid], &serde_json::json!({}))
            .await
    }

    /// `DELETE /api/hosts/{id}/networks/{net}`
    pub async fn remove_host_from_network(&self, host_id: &str, netid: &str) -> Result<(), Error> {
        debug!(host_id, netid, "removing host from network");
        self.delete(&["api", "hosts", host_id, "networks", netid]).await
    }
}
