// Relay, egress, ingress and internet-gateway endpoints
//
// All live under `/api/nodes/{net}/{id}/...` and return the updated node.

use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::{
    CreateRelayRequest, EgressGatewayRequest, InetNodeRequest, IngressGatewayRequest, NodeResponse,
};

impl RestClient {
    // ── Relay ────────────────────────────────────────────────────────

    /// `POST /api/nodes/{net}/{id}/createrelay`
    pub async fn create_relay(&self, request: &CreateRelayRequest) -> Result<NodeResponse, Error> {
        debug!(node_id = %request.nodeid, relayed = request.relayaddrs.len(), "creating relay");
        self.post(
            &["api", "nodes", &request.netid, &request.nodeid, "createrelay"],
            request,
        )
        .await
    }

    /// `DELETE /api/nodes/{net}/{id}/deleterelay`
    pub async fn delete_relay(&self, netid: &str, node_id: &str) -> Result<NodeResponse, Error> {
        debug!(node_id, "deleting relay");
        self.delete_with_response(&["api", "nodes", netid, node_id, "deleterelay"])
            .await
    }

    // ── Egress ───────────────────────────────────────────────────────

    /// `POST /api/nodes/{net}/{id}/creategateway`
    pub async fn create_egress(
        &self,
        netid: &str,
        node_id: &str,
        request: &EgressGatewayRequest,
    ) -> Result<NodeResponse, Error> {
        debug!(node_id, ranges = ?request.ranges, "creating egress gateway");
        self.post(&["api", "nodes", netid, node_id, "creategateway"], request)
            .await
    }

    /// `DELETE /api/nodes/{net}/{id}/deletegateway`
    pub async fn delete_egress(&self, netid: &str, node_id: &str) -> Result<NodeResponse, Error> {
        debug!(node_id, "deleting egress gateway");
        self.delete_with_response(&["api", "nodes", netid, node_id, "deletegateway"])
            .await
    }

    // ── Ingress ──────────────────────────────────────────────────────

    /// `POST /api/nodes/{net}/{id}/createingress`
    pub async fn create_ingress(
        &self,
        netid: &str,
        node_id: &str,
        request: &IngressGatewayRequest,
    ) -> Result<NodeResponse, Error> {
        debug!(node_id, "creating ingress gateway");
        self.post(&["api", "nodes", netid, node_id, "createingress"], request)
            .await
    }

    /// `DELETE /api/nodes/{net}/{id}/deleteingress`
    pub async fn delete_ingress(&self, netid: &str, node_id: &str) -> Result<NodeResponse, Error> {
        debug!(node_id, "deleting ingress gateway");
        self.delete_with_response(&["api", "nodes", netid, node_id, "deleteingress"])
            .await
    }

    // ── Internet gateway ─────────────────────────────────────────────

    /// `POST /api/nodes/{net}/{id}/inet_gw`
    pub async fn create_internet_gateway(
        &self,
        netid: &str,
        node_id: &str,
        request: &InetNodeRequest,
    ) -> Result<NodeResponse, Error> {
        debug!(node_id, clients = request.inet_node_client_ids.len(), "creating internet gateway");
        self.post(&["api", "nodes", netid, node_id, "inet_gw"], request)
            .await
    }

    /// `PUT /api/nodes/{net}/{id}/inet_gw`
    pub async fn update_internet_gateway(
        &self,
        netid: &str,
        node_id: &str,
        request: &InetNodeRequest,
    ) -> Result<NodeResponse, Error> {
        debug!(node_id, clients = request.inet_node_client_ids.len(), "updating internet gateway");
        self.put(&["api", "nodes", netid, node_id, "inet_gw"], request)
            .await
    }

    /// `DELETE /api/nodes/{net}/{id}/inet_gw`
    pub async fn delete_internet_gateway(
        &self,
        netid: &str,
        node_id: &str,
    ) -> Result<NodeResponse, Error> {
        debug!(node_id, "deleting internet gateway");
        self.delete_with_response(&["api", "nodes", netid, node_id, "inet_gw"])
            .await
    }
}
