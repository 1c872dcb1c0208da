//! Shared configuration for meshdeck.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `meshdeck_core::ControllerConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use meshdeck_core::{AuthCredentials, ControllerConfig, TlsVerification};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "meshdeck";

/// Environment variable holding a token when the profile names none.
pub const TOKEN_ENV: &str = "MESHDECK_TOKEN";
pub const USERNAME_ENV: &str = "MESHDECK_USERNAME";
pub const PASSWORD_ENV: &str = "MESHDECK_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// How a profile authenticates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Master key or a previously issued bearer token.
    #[default]
    Token,
    /// Username and password exchanged for a token at connect time.
    Password,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Token => "token",
            Self::Password => "password",
        })
    }
}

impl std::str::FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token" => Ok(Self::Token),
            "password" => Ok(Self::Password),
            other => Err(ConfigError::Validation {
                field: "auth_mode".into(),
                reason: format!("expected 'token' or 'password', got '{other}'"),
            }),
        }
    }
}

/// A named server profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL (e.g., "https://api.mesh.example.com").
    pub server: String,

    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Token (plaintext; prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Path to a custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    /// Set one field from its TOML key, as `config set` does.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "server" => {
                parse_server_url(value)?;
                self.server = value.to_owned();
            }
            "auth_mode" => self.auth_mode = value.parse()?,
            "token" => self.token = optional(value),
            "token_env" => self.token_env = optional(value),
            "username" => self.username = optional(value),
            "password" => self.password = optional(value),
            "ca_cert" => self.ca_cert = optional(value).map(PathBuf::from),
            "insecure" => self.insecure = Some(parse_flag(key, value)?),
            "timeout" => {
                self.timeout = Some(value.parse().map_err(|_| ConfigError::Validation {
                    field: key.into(),
                    reason: format!("'{value}' is not a number of seconds"),
                })?);
            }
            other => {
                return Err(ConfigError::Validation {
                    field: other.into(),
                    reason: "unknown profile key".into(),
                });
            }
        }
        Ok(())
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::Validation {
            field: key.into(),
            reason: format!("'{value}' is not true or false"),
        }),
    }
}

/// Parse and check a server URL.
pub fn parse_server_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

impl Config {
    /// Name of the profile to use: the override, else `default_profile`,
    /// else `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via platform conventions.
///
/// `MESHDECK_CONFIG` overrides the location.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("MESHDECK_CONFIG") {
        return PathBuf::from(path);
    }
    ProjectDirs::from("io", "meshdeck", "meshdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("meshdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if any), then `MESHDECK_*`
/// variables (`MESHDECK_DEFAULTS__TIMEOUT=60` sets `defaults.timeout`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("MESHDECK_")
                .only(&[
                    "default_profile",
                    "defaults__output",
                    "defaults__color",
                    "defaults__insecure",
                    "defaults__timeout",
                ])
                .split("__"),
        );

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret storage ──────────────────────────────────────────────────

/// Which secret of a profile is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Token,
    Password,
}

impl SecretKind {
    fn account(self, profile_name: &str) -> String {
        match self {
            Self::Token => format!("{profile_name}/token"),
            Self::Password => format!("{profile_name}/password"),
        }
    }
}

/// Where profile secrets are kept outside the config file.
pub trait SecretStore {
    fn get(&self, profile_name: &str, kind: SecretKind) -> Option<SecretString>;
    fn set(
        &self,
        profile_name: &str,
        kind: SecretKind,
        secret: &SecretString,
    ) -> Result<(), ConfigError>;
}

/// The OS credential manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringStore;

impl SecretStore for KeyringStore {
    fn get(&self, profile_name: &str, kind: SecretKind) -> Option<SecretString> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.account(profile_name)).ok()?;
        match entry.get_password() {
            Ok(secret) => Some(SecretString::from(secret)),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!(error = %e, "keyring lookup failed");
                None
            }
        }
    }

    fn set(
        &self,
        profile_name: &str,
        kind: SecretKind,
        secret: &SecretString,
    ) -> Result<(), ConfigError> {
        keyring::Entry::new(KEYRING_SERVICE, &kind.account(profile_name))?
            .set_password(secret.expose_secret())?;
        Ok(())
    }
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve a token: env var → keyring → plaintext.
pub fn resolve_token(
    profile: &Profile,
    profile_name: &str,
    store: &dyn SecretStore,
) -> Result<SecretString, ConfigError> {
    let env_name = profile.token_env.as_deref().unwrap_or(TOKEN_ENV);
    if let Ok(val) = std::env::var(env_name) {
        if !val.is_empty() {
            return Ok(SecretString::from(val));
        }
    }

    if let Some(secret) = store.get(profile_name, SecretKind::Token) {
        return Ok(secret);
    }

    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve username + password: env var → keyring → plaintext.
pub fn resolve_password_credentials(
    profile: &Profile,
    profile_name: &str,
    store: &dyn SecretStore,
) -> Result<(String, SecretString), ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok((username, SecretString::from(pw)));
    }

    if let Some(pw) = store.get(profile_name, SecretKind::Password) {
        return Ok((username, pw));
    }

    if let Some(ref pw) = profile.password {
        return Ok((username, SecretString::from(pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve `AuthCredentials` from a profile's `auth_mode`.
///
/// A password profile that already holds a saved token (from
/// `login --save`) uses the token.
pub fn resolve_auth(
    profile: &Profile,
    profile_name: &str,
    store: &dyn SecretStore,
) -> Result<AuthCredentials, ConfigError> {
    match profile.auth_mode {
        AuthMode::Token => Ok(AuthCredentials::Token(resolve_token(
            profile,
            profile_name,
            store,
        )?)),
        AuthMode::Password => {
            if let Some(token) = store.get(profile_name, SecretKind::Token) {
                return Ok(AuthCredentials::Token(token));
            }
            let (username, password) =
                resolve_password_credentials(profile, profile_name, store)?;
            Ok(AuthCredentials::Credentials { username, password })
        }
    }
}

/// TLS mode for a profile; `insecure` wins over `ca_cert`.
pub fn profile_tls(profile: &Profile, defaults: &Defaults) -> TlsVerification {
    if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Build a `ControllerConfig` from a profile, with no CLI overrides.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    store: &dyn SecretStore,
) -> Result<ControllerConfig, ConfigError> {
    let url = parse_server_url(&profile.server)?;
    let auth = resolve_auth(profile, profile_name, store)?;

    let mut config = ControllerConfig::new(url, auth);
    config.tls = profile_tls(profile, defaults);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    /// In-memory stand-in for the OS keyring.
    #[derive(Default)]
    struct MemoryStore(RefCell<HashMap<String, String>>);

    impl SecretStore for MemoryStore {
        fn get(&self, profile_name: &str, kind: SecretKind) -> Option<SecretString> {
            self.0
                .borrow()
                .get(&kind.account(profile_name))
                .map(|s| SecretString::from(s.clone()))
        }

        fn set(
            &self,
            profile_name: &str,
            kind: SecretKind,
            secret: &SecretString,
        ) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(
                kind.account(profile_name),
                secret.expose_secret().to_owned(),
            );
            Ok(())
        }
    }

    fn jail_err(e: ConfigError) -> figment::Error {
        figment::Error::from(e.to_string())
    }

    #[test]
    fn loads_profiles_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                default_profile = "prod"

                [defaults]
                output = "json"

                [profiles.prod]
                server = "https://api.mesh.example.com"
                auth_mode = "password"
                username = "admin"
                timeout = 10
                "#,
            )?;

            let cfg = load_config_from(Path::new("config.toml")).map_err(jail_err)?;
            assert_eq!(cfg.default_profile.as_deref(), Some("prod"));
            assert_eq!(cfg.defaults.output, "json");
            assert_eq!(cfg.defaults.timeout, 30);

            let prod = cfg.profile("prod").map_err(jail_err)?;
            assert_eq!(prod.auth_mode, AuthMode::Password);
            assert_eq!(prod.username.as_deref(), Some("admin"));
            assert_eq!(prod.timeout, Some(10));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("MESHDECK_DEFAULTS__TIMEOUT", "90");
            jail.set_env("MESHDECK_DEFAULT_PROFILE", "lab");
            jail.set_env("MESHDECK_TOKEN", "not-config");

            let cfg = load_config_from(Path::new("missing.toml")).map_err(jail_err)?;
            assert_eq!(cfg.defaults.timeout, 90);
            assert_eq!(cfg.active_profile_name(None), "lab");
            assert_eq!(cfg.active_profile_name(Some("prod")), "prod");
            Ok(())
        });
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut profile = Profile::new("https://mesh.example.com");
        profile.set("auth_mode", "password").unwrap();
        profile.set("username", "ops").unwrap();
        cfg.profiles.insert("default".into(), profile);
        save_config_to(&path, &cfg).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("auth_mode = \"password\""));
        assert!(!written.contains("token"));

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles, cfg.profiles);
    }

    #[test]
    fn profile_set_rejects_bad_values() {
        let mut profile = Profile::new("https://mesh.example.com");
        assert!(profile.set("server", "ftp://mesh").is_err());
        assert!(profile.set("auth_mode", "oauth").is_err());
        assert!(profile.set("timeout", "soon").is_err());
        assert!(profile.set("colour", "red").is_err());

        profile.set("insecure", "yes").unwrap();
        assert_eq!(profile.insecure, Some(true));
        profile.set("token", "").unwrap();
        assert_eq!(profile.token, None);
    }

    #[test]
    fn token_prefers_env_then_keyring_then_plaintext() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let store = MemoryStore::default();
            let mut profile = Profile::new("https://mesh.example.com");
            profile.token = Some("plain".into());
            profile.token_env = Some("MESH_LAB_TOKEN".into());

            let token = resolve_token(&profile, "lab", &store).map_err(jail_err)?;
            assert_eq!(token.expose_secret(), "plain");

            store
                .set("lab", SecretKind::Token, &SecretString::from("stored".to_owned()))
                .map_err(jail_err)?;
            let token = resolve_token(&profile, "lab", &store).map_err(jail_err)?;
            assert_eq!(token.expose_secret(), "stored");

            jail.set_env("MESH_LAB_TOKEN", "from-env");
            let token = resolve_token(&profile, "lab", &store).map_err(jail_err)?;
            assert_eq!(token.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn missing_token_is_reported_per_profile() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let store = MemoryStore::default();
            let profile = Profile::new("https://mesh.example.com");
            let err = resolve_token(&profile, "lab", &store).unwrap_err();
            assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "lab"));
            Ok(())
        });
    }

    #[test]
    fn password_profile_uses_saved_token_first() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let store = MemoryStore::default();
            let mut profile = Profile::new("https://mesh.example.com");
            profile.auth_mode = AuthMode::Password;
            profile.username = Some("admin".into());
            profile.password = Some("hunter2".into());

            let auth = resolve_auth(&profile, "prod", &store).map_err(jail_err)?;
            assert!(matches!(
                auth,
                AuthCredentials::Credentials { ref username, .. } if username == "admin"
            ));

            store
                .set("prod", SecretKind::Token, &SecretString::from("jwt".to_owned()))
                .map_err(jail_err)?;
            let auth = resolve_auth(&profile, "prod", &store).map_err(jail_err)?;
            assert!(matches!(auth, AuthCredentials::Token(_)));
            Ok(())
        });
    }

    #[test]
    fn controller_config_applies_tls_and_timeout() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let store = MemoryStore::default();
            let mut profile = Profile::new("https://mesh.example.com");
            profile.token = Some("master".into());
            profile.ca_cert = Some(PathBuf::from("/etc/mesh/ca.pem"));

            let defaults = Defaults::default();
            let cfg =
                profile_to_controller_config(&profile, "default", &defaults, &store)
                    .map_err(jail_err)?;
            assert_eq!(cfg.url.as_str(), "https://mesh.example.com/");
            assert_eq!(
                cfg.tls,
                TlsVerification::CustomCa(PathBuf::from("/etc/mesh/ca.pem"))
            );
            assert_eq!(cfg.timeout, Duration::from_secs(30));

            profile.insecure = Some(true);
            profile.timeout = Some(5);
            let cfg =
                profile_to_controller_config(&profile, "default", &defaults, &store)
                    .map_err(jail_err)?;
            assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
            assert_eq!(cfg.timeout, Duration::from_secs(5));
            Ok(())
        });
    }
}
