use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::{AclResponse, Envelope};

impl RestClient {
    /// `GET /api/v1/acls?network={net}`
    pub async fn list_acls(&self, netid: &str) -> Result<Vec<AclResponse>, Error> {
        let env: Envelope<Option<Vec<AclResponse>>> = self
            .get_with_params(&["api", "v1", "acls"], &[("network", netid)])
            .await?;
        Ok(Self::unwrap_envelope(env).unwrap_or_default())
    }

    /// `POST /api/v1/acls`
    pub async fn create_acl(&self, acl: &AclResponse) -> Result<AclResponse, Error> {
        debug!(name = %acl.name, network = %acl.network_id, "creating acl");
        let env: Envelope<AclResponse> = self.post(&["api", "v1", "acls"], acl).await?;
        Ok(Self::unwrap_envelope(env))
    }

    /// `PUT /api/v1/acls`
    pub async fn update_acl(&self, acl: &AclResponse) -> Result<AclResponse, Error> {
        debug!(acl_id = %acl.id, "updating acl");
        let env: Envelope<AclResponse> = self.put(&["api", "v1", "acls"], acl).await?;
        Ok(Self::unwrap_envelope(env))
    }

    /// `DELETE /api/v1/acls?acl_id={id}`
    pub async fn delete_acl(&self, acl_id: &str) -> Result<(), Error> {
        debug!(acl_id, "deleting acl");
        self.delete_with_params(&["api", "v1", "acls"], &[("acl_id", acl_id)])
            .await
    }
}
