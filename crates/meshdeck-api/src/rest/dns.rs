use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::DnsEntryResponse;

impl RestClient {
    /// `GET /api/dns/adm/{net}` (all entries, custom and node-derived).
    pub async fn list_dns(&self, netid: &str) -> Result<Vec<DnsEntryResponse>, Error> {
        let entries: Option<Vec<DnsEntryResponse>> =
            self.get(&["api", "dns", "adm", netid]).await?;
        Ok(entries.unwrap_or_default())
    }

    /// `POST /api/dns/{net}`
    pub async fn create_dns(
        &self,
        netid: &str,
        entry: &DnsEntryResponse,
    ) -> Result<DnsEntryResponse, Error> {
        debug!(netid, name = %entry.name, "creating dns entry");
        self.post(&["api", "dns", netid], entry).await
    }

    /// `DELETE /api/dns/{net}/{name}`
    pub async fn delete_dns(&self, netid: &str, name: &str) -> Result<(), Error> {
        debug!(netid, name, "deleting dns entry");
        self.delete(&["api", "dns", netid, name]).await
    }
}
