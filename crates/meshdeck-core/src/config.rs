// ── Runtime connection configuration ──
//
// Describes how to reach and authenticate with a controller. Carries
// credentials and tuning but never touches disk; meshdeck-config builds
// one from a profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use meshdeck_api::{Credentials, TlsMode, TransportConfig};

/// Credential data for one session.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// Pre-issued bearer token or master key.
    Token(SecretString),
    /// Exchanged for a bearer token at connect time.
    Credentials {
        username: String,
        password: SecretString,
    },
}

impl AuthCredentials {
    pub(crate) fn to_api(&self) -> Credentials {
        match self {
            Self::Token(token) => Credentials::Token(token.clone()),
            Self::Credentials { username, password } => Credentials::Password {
                username: username.clone(),
                password: password.clone(),
            },
        }
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    #[default]
    SystemDefaults,
    CustomCa(std::path::PathBuf),
    DangerAcceptInvalid,
}

/// Configuration for one controller connection.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Server base URL, e.g. `https://api.mesh.example.com`.
    pub url: Url,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Seconds between background refreshes; 0 disables them.
    pub refresh_interval_secs: u64,
}

impl ControllerConfig {
    pub fn new(url: Url, auth: AuthCredentials) -> Self {
        Self {
            url,
            auth,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_interval_secs: 0,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
