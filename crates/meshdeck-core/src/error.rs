// ── Core error types ──
//
// User-facing errors from meshdeck-core. Consumers never see raw reqwest
// errors or JSON parse failures; `From<meshdeck_api::Error>` translates
// transport-layer errors into domain variants.

use thiserror::Error;

use crate::validate::ValidationErrors;

/// Outcome of the undo issued after a failed second step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    Restored,
    /// The undo call failed too; `message` is its error.
    NotRestored { message: String },
}

impl Compensation {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored)
    }
}

impl std::fmt::Display for Compensation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restored => f.write_str("previous state restored"),
            Self::NotRestored { message } => {
                write!(f, "previous state NOT restored: {message}")
            }
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not connected to the server")]
    Disconnected,

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Network not found: {identifier}")]
    NetworkNotFound { identifier: String },

    #[error("Host not found: {identifier}")]
    HostNotFound { identifier: String },

    #[error("Node not found: {identifier}")]
    NodeNotFound { identifier: String },

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// A node cannot take the requested role (see `topology::eligibility`).
    #[error("{node} cannot be used here: {reason}")]
    NotEligible { node: String, reason: String },

    /// The second step of a two-step topology change failed.
    #[error("{step} failed: {message} ({compensation})")]
    PartialFailure {
        step: String,
        message: String,
        compensation: Compensation,
    },

    #[error("Operation rejected by server: {message}")]
    Rejected { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NetworkNotFound { .. }
                | Self::HostNotFound { .. }
                | Self::NodeNotFound { .. }
                | Self::NotFound { .. }
        )
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<meshdeck_api::Error> for CoreError {
    fn from(err: meshdeck_api::Error) -> Self {
        match err {
            meshdeck_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            meshdeck_api::Error::MissingToken => CoreError::AuthenticationFailed {
                message: "no token -- configure a token or log in".into(),
            },
            meshdeck_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), |u| u.origin().ascii_serialization()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            meshdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            meshdeck_api::Error::InvalidBaseUrl { url } => CoreError::Config {
                message: format!("Server URL cannot be used as an API base: {url}"),
            },
            meshdeck_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            meshdeck_api::Error::Api { status: 404, message } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            meshdeck_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            meshdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected response from server: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_404_becomes_not_found() {
        let err = CoreError::from(meshdeck_api::Error::Api {
            status: 404,
            message: "no result found".into(),
        });
        assert!(err.is_not_found());
    }

    #[test]
    fn api_status_is_kept() {
        let err = CoreError::from(meshdeck_api::Error::Api {
            status: 409,
            message: "tag already exists".into(),
        });
        assert!(matches!(err, CoreError::Api { status: Some(409), .. }));
    }

    #[test]
    fn partial_failure_reports_compensation() {
        let err = CoreError::PartialFailure {
            step: "add to new relay".into(),
            message: "boom".into(),
            compensation: Compensation::Restored,
        };
        assert_eq!(
            err.to_string(),
            "add to new relay failed: boom (previous state restored)"
        );

        let err = CoreError::PartialFailure {
            step: "recreate egress gateway".into(),
            message: "boom".into(),
            compensation: Compensation::NotRestored {
                message: "gateway node offline".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "recreate egress gateway failed: boom \
             (previous state NOT restored: gateway node offline)"
        );
    }
}
