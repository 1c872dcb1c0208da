use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::{CreateTagRequest, Envelope, TagResponse, UpdateTagRequest};

impl RestClient {
    /// `GET /api/v1/tags?network={net}`
    pub async fn list_tags(&self, netid: &str) -> Result<Vec<TagResponse>, Error> {
        let env: Envelope<Option<Vec<TagResponse>>> = self
            .get_with_params(&["api", "v1", "tags"], &[("network", netid)])
            .await?;
        Ok(Self::unwrap_envelope(env).unwrap_or_default())
    }

    /// `POST /api/v1/tags`
    pub async fn create_tag(&self, request: &CreateTagRequest) -> Result<TagResponse, Error> {
        debug!(tag = %request.tag_name, network = %request.network, "creating tag");
        let env: Envelope<TagResponse> = self.post(&["api", "v1", "tags"], request).await?;
        Ok(Self::unwrap_envelope(env))
    }

    /// `PUT /api/v1/tags`
    pub async fn update_tag(&self, request: &UpdateTagRequest) -> Result<TagResponse, Error> {
        debug!(tag_id = %request.id, "updating tag");
        let env: Envelope<TagResponse> = self.put(&["api", "v1", "tags"], request).await?;
        Ok(Self::unwrap_envelope(env))
    }

    /// `DELETE /api/v1/tags?tag_id={id}`
    pub async fn delete_tag(&self, tag_id: &str) -> Result<(), Error> {
        debug!(tag_id, "deleting tag");
        self.delete_with_params(&["api", "v1", "tags"], &[("tag_id", tag_id)])
            .await
    }
}
