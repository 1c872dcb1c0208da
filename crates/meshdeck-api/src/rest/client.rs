// REST API HTTP client
//
// Wraps `reqwest::Client` with bearer-token injection, segment-safe URL
// construction, and uniform error extraction. Endpoint wrappers live in
// sibling modules as inherent methods on `RestClient`.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{Error, extract_error_message};
use crate::transport::TransportConfig;
use crate::types::Envelope;

/// Async client for the controller REST API.
///
/// Every request carries `Authorization: Bearer <token>` once a token has
/// been set, either directly or through [`RestClient::login`]. The token is
/// swappable at runtime so a re-login never needs a new client.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    token: ArcSwapOption<SecretString>,
}

impl RestClient {
    /// Create a client rooted at the controller's base URL
    /// (e.g. `https://api.mesh.example.com`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl {
                url: base_url.to_string(),
            });
        }
        Ok(Self {
            http,
            base_url,
            token: ArcSwapOption::empty(),
        })
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Install (or replace) the bearer token used on every request.
    pub fn set_token(&self, token: SecretString) {
        self.token.store(Some(Arc::new(token)));
    }

    /// Drop the bearer token. Subsequent calls go out unauthenticated.
    pub fn clear_token(&self) {
        self.token.store(None);
    }

    /// Whether a bearer token is currently installed.
    pub fn has_token(&self) -> bool {
        self.token.load().is_some()
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments to the base URL, percent-encoding each one.
    ///
    /// `["api", "nodes", "my net"]` becomes `{base}/api/nodes/my%20net`.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let guard = self.token.load();
        let Some(token) = guard.as_ref() else {
            return Ok(builder);
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid token header value: {e}"),
            })?;
        value.set_sensitive(true);
        Ok(builder.header(AUTHORIZATION, value))
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, Error> {
        let url = self.url(segments)?;
        debug!("GET {url}");

        let resp = self.apply_auth(self.http.get(url))?.send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.url(segments)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .apply_auth(self.http.get(url).query(params))?
            .send()
            .await?;
        handle_response(resp).await
    }

    /// GET returning the raw response text (config files, plain payloads).
    pub(crate) async fn get_text(&self, segments: &[&str]) -> Result<String, Error> {
        let url = self.url(segments)?;
        debug!("GET {url}");

        let resp = self.apply_auth(self.http.get(url))?.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.text().await?)
        } else {
            Err(parse_error(status, resp).await)
        }
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(segments)?;
        debug!("POST {url}");

        let resp = self.apply_auth(self.http.post(url).json(body))?.send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn post_no_response<B: Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(segments)?;
        debug!("POST {url}");

        let resp = self.apply_auth(self.http.post(url).json(body))?.send().await?;
        handle_empty(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(segments)?;
        debug!("PUT {url}");

        let resp = self.apply_auth(self.http.put(url).json(body))?.send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn delete(&self, segments: &[&str]) -> Result<(), Error> {
        let url = self.url(segments)?;
        debug!("DELETE {url}");

        let resp = self.apply_auth(self.http.delete(url))?.send().await?;
        handle_empty(resp).await
    }

    pub(crate) async fn delete_with_response<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<T, Error> {
        let url = self.url(segments)?;
        debug!("DELETE {url}");

        let resp = self.apply_auth(self.http.delete(url))?.send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn delete_with_params(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> Result<(), Error> {
        let url = self.url(segments)?;
        debug!("DELETE {url} params={params:?}");

        let resp = self
            .apply_auth(self.http.delete(url).query(params))?
            .send()
            .await?;
        handle_empty(resp).await
    }

    /// Unwrap a `{Code, Message, Response}` envelope returned by the
    /// newer `/api/v1/` handlers and the login endpoint.
    pub(crate) fn unwrap_envelope<T>(envelope: Envelope<T>) -> T {
        envelope.response
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();
    let message = extract_error_message(status, &raw);

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Authentication { message };
    }

    Error::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RestClient {
        let base = Url::parse(base).expect("valid url");
        RestClient::with_client(reqwest::Client::new(), base).expect("client")
    }

    #[test]
    fn url_appends_segments() {
        let c = client("https://api.example.com");
        let url = c.url(&["api", "nodes", "net-1"]).expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/api/nodes/net-1");
    }

    #[test]
    fn url_keeps_base_prefix_and_encodes() {
        let c = client("https://example.com/mesh/");
        let url = c.url(&["api", "dns", "my net", "a/b"]).expect("url");
        assert_eq!(
            url.as_str(),
            "https://example.com/mesh/api/dns/my%20net/a%2Fb"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let base = Url::parse("mailto:ops@example.com").expect("valid url");
        let result = RestClient::with_client(reqwest::Client::new(), base);
        assert!(matches!(result, Err(Error::InvalidBaseUrl { .. })));
    }

    #[test]
    fn token_can_be_swapped() {
        let c = client("https://api.example.com");
        assert!(!c.has_token());
        c.set_token(SecretString::from("abc".to_owned()));
        assert!(c.has_token());
        c.clear_token();
        assert!(!c.has_token());
    }
}
