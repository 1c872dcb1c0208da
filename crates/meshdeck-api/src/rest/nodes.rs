// Node endpoints

use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::NodeResponse;

impl RestClient {
    /// `GET /api/nodes` (all networks the caller can see).
    pub async fn list_nodes(&self) -> Result<Vec<NodeResponse>, Error> {
        let nodes: Option<Vec<NodeResponse>> = self.get(&["api", "nodes"]).await?;
        Ok(nodes.unwrap_or_default())
    }

    /// `GET /api/nodes/{net}`
    pub async fn list_network_nodes(&self, netid: &str) -> Result<Vec<NodeResponse>, Error> {
        let nodes: Option<Vec<NodeResponse>> = self.get(&["api", "nodes", netid]).await?;
        Ok(nodes.unwrap_or_default())
    }

    /// `GET /api/nodes/{net}/{id}`
    pub async fn get_node(&self, netid: &str, node_id: &str) -> Result<NodeResponse, Error> {
        self.get(&["api", "nodes", netid, node_id]).await
    }

    /// `PUT /api/nodes/{net}/{id}`
    pub async fn update_node(&self, node: &NodeResponse) -> Result<NodeResponse, Error> {
        debug!(node_id = %node.id, network = %node.network, "updating node");
        self.put(&["api", "nodes", &node.network, &node.id], node).await
    }

    /// `DELETE /api/nodes/{net}/{id}`
    pub async fn delete_node(&self, netid: &str, node_id: &str) -> Result<(), Error> {
        debug!(node_id, netid, "deleting node");
        self.delete(&["api", "nodes", netid, node_id]).await
    }
}
