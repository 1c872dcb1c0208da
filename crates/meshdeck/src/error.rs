//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use meshdeck_config::ConfigError;
use meshdeck_core::{Compensation, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to server at {url}")]
    #[diagnostic(
        code(meshdeck::connection_failed),
        help(
            "Check that the server API is reachable.\n\
             Try: meshdeck server info --server {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS certificate verification failed: {reason}")]
    #[diagnostic(
        code(meshdeck::tls_error),
        help(
            "Configure ca_cert in your profile for a private CA,\n\
             or use --insecure (-k) to skip verification."
        )
    )]
    TlsError { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(meshdeck::auth_failed),
        help(
            "Check the token or password of profile '{profile}'.\n\
             Run: meshdeck login --save  or  meshdeck config set-secret"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(meshdeck::no_credentials),
        help(
            "Configure credentials with: meshdeck config init\n\
             Or set the MESHDECK_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(meshdeck::not_found),
        help("Run: meshdeck {list_command} to see available entries")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Conflict: {message}")]
    #[diagnostic(code(meshdeck::conflict))]
    Conflict { message: String },

    #[error("{node} cannot be used here: {reason}")]
    #[diagnostic(
        code(meshdeck::not_eligible),
        help("Run: meshdeck nodes candidates <network> --role <role> to see eligible nodes")
    )]
    NotEligible { node: String, reason: String },

    #[error("{step} failed: {message}")]
    #[diagnostic(code(meshdeck::partial_failure), help("{outcome}"))]
    PartialFailure {
        step: String,
        message: String,
        outcome: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Permission denied: {message}")]
    #[diagnostic(
        code(meshdeck::forbidden),
        help("The authenticated user lacks the role required for this operation.")
    )]
    Forbidden { message: String },

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(meshdeck::api_error))]
    ApiError { status: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(meshdeck::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid input")]
    #[diagnostic(code(meshdeck::validation))]
    InvalidInput {
        #[help]
        details: String,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(meshdeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: meshdeck config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(meshdeck::no_config),
        help(
            "Create a profile with: meshdeck config init\n\
             Expected at: {path}\n\
             Or pass --server and --token."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(meshdeck::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Prompt failed: {0}")]
    #[diagnostic(
        code(meshdeck::prompt),
        help("Run interactively or pass the value as a flag.")
    )]
    Prompt(String),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(meshdeck::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.")
    )]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(meshdeck::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(meshdeck::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::NotEligible { .. } => exit_code::CONFLICT,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::InvalidInput { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            Self::Config(err) => match err {
                ConfigError::NoCredentials { .. } => exit_code::AUTH,
                ConfigError::UnknownProfile { .. } => exit_code::NOT_FOUND,
                ConfigError::Validation { .. } => exit_code::USAGE,
                _ => exit_code::GENERAL,
            },
            _ => exit_code::GENERAL,
        }
    }

    pub fn not_found(
        resource_type: &str,
        identifier: impl Into<String>,
        list_command: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                if reason.starts_with("TLS error") {
                    CliError::TlsError { reason }
                } else {
                    CliError::ConnectionFailed {
                        url,
                        source: reason.into(),
                    }
                }
            }

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::Disconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                source: "the session was closed".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::NetworkNotFound { identifier } => {
                CliError::not_found("network", identifier, "networks list")
            }

            CoreError::HostNotFound { identifier } => {
                CliError::not_found("host", identifier, "hosts list")
            }

            CoreError::NodeNotFound { identifier } => {
                CliError::not_found("node", identifier, "nodes list")
            }

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command_for(&entity_type),
                resource_type: entity_type,
                identifier,
            },

            CoreError::ValidationFailed(errors) => CliError::InvalidInput {
                details: errors
                    .errors()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            },

            CoreError::NotEligible { node, reason } => CliError::NotEligible { node, reason },

            CoreError::PartialFailure {
                step,
                message,
                compensation,
            } => CliError::PartialFailure {
                step,
                message,
                outcome: match compensation {
                    Compensation::Restored => {
                        "The first step was undone; nothing changed on the server.".into()
                    }
                    Compensation::NotRestored { message } => format!(
                        "The first step could NOT be undone ({message}). Check the topology \
                         with `meshdeck relays list` or `meshdeck egress list`."
                    ),
                },
            },

            CoreError::Rejected { message } => CliError::Conflict { message },

            CoreError::Api {
                message,
                status: Some(401),
            } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::Api {
                message,
                status: Some(403),
            } => CliError::Forbidden { message },

            CoreError::Api {
                message,
                status: Some(409),
            } => CliError::Conflict { message },

            CoreError::Api { message, status } => CliError::ApiError {
                status: status.map_or_else(|| "-".into(), |s| s.to_string()),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

/// The list command for a core entity type name.
fn list_command_for(entity_type: &str) -> String {
    match entity_type {
        "external client" => "ext-clients list".into(),
        "user group" => "groups list".into(),
        "ACL rule" => "acls list".into(),
        "enrollment key" => "enrollment-keys list".into(),
        "DNS entry" => "dns list".into(),
        other => format!("{}s list", other.replace(' ', "-")),
    }
}

#[cfg(test)]
mod tests {
    use meshdeck_core::{Compensation, ValidationErrors};

    use super::*;

    #[test]
    fn validation_failure_is_a_usage_error() {
        let mut errors = ValidationErrors::new();
        errors.push("name", "is required");
        errors.push("ipv4_range", "not a CIDR");
        let err = CliError::from(CoreError::ValidationFailed(errors));
        assert_eq!(err.exit_code(), exit_code::USAGE);
        let CliError::InvalidInput { details } = err else {
            panic!("expected InvalidInput");
        };
        assert_eq!(details, "name: is required\nipv4_range: not a CIDR");
    }

    #[test]
    fn typed_not_found_names_the_list_command() {
        let err = CliError::from(CoreError::NetworkNotFound {
            identifier: "ghost".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(
            err,
            CliError::NotFound { ref list_command, .. } if list_command == "networks list"
        ));
    }

    #[test]
    fn generic_not_found_maps_entity_type() {
        let err = CliError::from(CoreError::NotFound {
            entity_type: "external client".into(),
            identifier: "laptop".into(),
        });
        assert!(matches!(
            err,
            CliError::NotFound { ref list_command, .. } if list_command == "ext-clients list"
        ));
    }

    #[test]
    fn api_status_codes_pick_exit_codes() {
        let forbidden = CliError::from(CoreError::Api {
            message: "forbidden".into(),
            status: Some(403),
        });
        assert_eq!(forbidden.exit_code(), exit_code::PERMISSION);

        let conflict = CliError::from(CoreError::Api {
            message: "exists".into(),
            status: Some(409),
        });
        assert_eq!(conflict.exit_code(), exit_code::CONFLICT);

        let other = CliError::from(CoreError::Api {
            message: "boom".into(),
            status: Some(500),
        });
        assert_eq!(other.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn tls_failures_are_connection_errors() {
        let err = CliError::from(CoreError::ConnectionFailed {
            url: String::new(),
            reason: "TLS error: unknown issuer".into(),
        });
        assert!(matches!(err, CliError::TlsError { .. }));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn partial_failure_reports_the_undo() {
        let err = CliError::from(CoreError::PartialFailure {
            step: "add to new relay".into(),
            message: "boom".into(),
            compensation: Compensation::NotRestored {
                message: "relay offline".into(),
            },
        });
        let CliError::PartialFailure { outcome, .. } = err else {
            panic!("expected PartialFailure");
        };
        assert!(outcome.contains("could NOT be undone (relay offline)"));
    }

    #[test]
    fn config_errors_keep_their_codes() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "default".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);

        let err = CliError::from(ConfigError::UnknownProfile { name: "lab".into() });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}
