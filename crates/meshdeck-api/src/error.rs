use thiserror::Error;

/// Top-level error type for the `meshdeck-api` crate.
///
/// Covers every failure mode of the REST surface: authentication,
/// transport, server-side rejections, and payload decoding.
/// `meshdeck-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed or the token was rejected (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An authenticated endpoint was called before a token was set.
    #[error("No bearer token -- log in first")]
    MissingToken,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server URL cannot carry path segments (e.g. `mailto:`).
    #[error("Server URL cannot be used as an API base: {url}")]
    InvalidBaseUrl { url: String },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// Non-success status with the message extracted from the body.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the token is missing or stale
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::MissingToken)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Error body shape returned by the controller: `{"Code": 400, "Message": "..."}`.
///
/// Some handlers emit lowercase keys, so both spellings are accepted.
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(alias = "message", rename = "Message", default)]
    message: Option<String>,
}

/// Pull the human-readable message out of an error response body.
///
/// Falls back to the raw body (truncated), then to the status text.
pub fn extract_error_message(status: reqwest::StatusCode, raw: &str) -> String {
    if let Ok(ErrorBody {
        message: Some(message),
    }) = serde_json::from_str::<ErrorBody>(raw)
    {
        if !message.is_empty() {
            return message;
        }
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .map_or_else(|| status.to_string(), str::to_owned);
    }

    trimmed.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn extracts_capitalized_message() {
        let msg = extract_error_message(
            StatusCode::BAD_REQUEST,
            r#"{"Code":400,"Message":"network name already exists"}"#,
        );
        assert_eq!(msg, "network name already exists");
    }

    #[test]
    fn extracts_lowercase_message() {
        let msg = extract_error_message(StatusCode::CONFLICT, r#"{"message":"duplicate tag"}"#);
        assert_eq!(msg, "duplicate tag");
    }

    #[test]
    fn falls_back_to_raw_body() {
        let msg = extract_error_message(StatusCode::BAD_GATEWAY, "upstream went away");
        assert_eq!(msg, "upstream went away");
    }

    #[test]
    fn falls_back_to_status_reason() {
        let msg = extract_error_message(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(msg, "Internal Server Error");
    }

    #[test]
    fn api_404_is_not_found() {
        let err = Error::Api {
            status: 404,
            message: "no such node".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }
}
