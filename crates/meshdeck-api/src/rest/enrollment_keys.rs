use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::{EnrollmentKeyRequest, EnrollmentKeyResponse};

impl RestClient {
    /// `GET /api/v1/enrollment-keys`
    pub async fn list_enrollment_keys(&self) -> Result<Vec<EnrollmentKeyResponse>, Error> {
        let keys: Option<Vec<EnrollmentKeyResponse>> =
            self.get(&["api", "v1", "enrollment-keys"]).await?;
        Ok(keys.unwrap_or_default())
    }

    /// `POST /api/v1/enrollment-keys`
    pub async fn create_enrollment_key(
        &self,
        request: &EnrollmentKeyRequest,
    ) -> Result<EnrollmentKeyResponse, Error> {
        debug!(networks = ?request.networks, "creating enrollment key");
        self.post(&["api", "v1", "enrollment-keys"], request).await
    }

    /// `PUT /api/v1/enrollment-keys/{id}`
    pub async fn update_enrollment_key(
        &self,
        key_id: &str,
        request: &EnrollmentKeyRequest,
    ) -> Result<EnrollmentKeyResponse, Error> {
        debug!(key_id, "updating enrollment key");
        self.put(&["api", "v1", "enrollment-keys", key_id], request)
            .await
    }

    /// `DELETE /api/v1/enrollment-keys/{id}`
    pub async fn delete_enrollment_key(&self, key_id: &str) -> Result<(), Error> {
        debug!(key_id, "deleting enrollment key");
        self.delete(&["api", "v1", "enrollment-keys", key_id]).await
    }
}
