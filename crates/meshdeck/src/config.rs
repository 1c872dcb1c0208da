//! CLI configuration: thin wrapper around `meshdeck_config`.
//!
//! Adds the resolution that respects `GlobalOpts` flag overrides
//! (`--server`, `--token`, `--insecure`, `--timeout`).

use std::time::Duration;

use secrecy::SecretString;

use meshdeck_config::{KeyringStore, SecretStore};
use meshdeck_core::{AuthCredentials, ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use meshdeck_config::{
    AuthMode, Config, Profile, SecretKind, config_path, load_config, load_config_or_default,
    save_config,
};

/// Resolve the active profile name from `--profile` and the config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// The profile `name`, or a `ProfileNotFound` error listing the others.
pub fn require_profile<'a>(config: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    config.profiles.get(name).ok_or_else(|| CliError::ProfileNotFound {
        name: name.into(),
        available: available_profiles(config),
    })
}

pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config
            .profiles
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Build a `ControllerConfig` from the config file, profile and flags.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    resolve(global, &cfg, &KeyringStore)
}

/// Flags win over the profile. Without a profile, `--server` plus
/// `--token` are enough.
pub fn resolve(
    global: &GlobalOpts,
    cfg: &Config,
    store: &dyn SecretStore,
) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let Some(profile) = cfg.profiles.get(&profile_name) else {
        if global.profile.is_some() {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        return from_flags(global, cfg, profile_name);
    };

    let server = global.server.as_deref().unwrap_or(&profile.server);
    let url = meshdeck_config::parse_server_url(server)?;

    let auth = match global.token {
        Some(ref token) => AuthCredentials::Token(SecretString::from(token.clone())),
        None => meshdeck_config::resolve_auth(profile, &profile_name, store)?,
    };

    let mut config = ControllerConfig::new(url, auth);
    config.tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        meshdeck_config::profile_tls(profile, &cfg.defaults)
    };
    config.timeout = Duration::from_secs(
        global
            .timeout
            .or(profile.timeout)
            .unwrap_or(cfg.defaults.timeout),
    );
    Ok(config)
}

fn from_flags(
    global: &GlobalOpts,
    cfg: &Config,
    profile_name: String,
) -> Result<ControllerConfig, CliError> {
    let server = global.server.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let url = meshdeck_config::parse_server_url(server)?;

    let token = global
        .token
        .clone()
        .ok_or(CliError::NoCredentials {
            profile: profile_name,
        })?;

    let mut config = ControllerConfig::new(url, AuthCredentials::Token(SecretString::from(token)));
    if global.insecure || cfg.defaults.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    config.timeout = Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout));
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    #[derive(Default)]
    struct MemoryStore(RefCell<HashMap<String, String>>);

    impl SecretStore for MemoryStore {
        fn get(&self, profile_name: &str, kind: SecretKind) -> Option<SecretString> {
            let key = format!("{profile_name}/{kind:?}");
            self.0.borrow().get(&key).map(|s| SecretString::from(s.clone()))
        }

        fn set(
            &self,
            profile_name: &str,
            kind: SecretKind,
            secret: &SecretString,
        ) -> Result<(), meshdeck_config::ConfigError> {
            self.0.borrow_mut().insert(
                format!("{profile_name}/{kind:?}"),
                secret.expose_secret().to_owned(),
            );
            Ok(())
        }
    }

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["meshdeck"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["networks", "list"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with(name: &str, profile: Profile) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(name.into(), profile);
        cfg.default_profile = Some(name.into());
        cfg
    }

    fn token_of(config: &ControllerConfig) -> String {
        match &config.auth {
            AuthCredentials::Token(t) => t.expose_secret().to_owned(),
            AuthCredentials::Credentials { .. } => panic!("expected a token"),
        }
    }

    #[test]
    fn flags_alone_build_a_config() {
        let g = global(&["--server", "https://mesh.example.com", "--token", "abc"]);
        let config = resolve(&g, &Config::default(), &MemoryStore::default()).unwrap();
        assert_eq!(config.url.as_str(), "https://mesh.example.com/");
        assert_eq!(token_of(&config), "abc");
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn missing_server_is_no_config() {
        let g = global(&[]);
        let err = resolve(&g, &Config::default(), &MemoryStore::default()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }

    #[test]
    fn server_without_token_is_no_credentials() {
        let g = global(&["--server", "https://mesh.example.com"]);
        let err = resolve(&g, &Config::default(), &MemoryStore::default()).unwrap_err();
        assert!(matches!(err, CliError::NoCredentials { .. }));
    }

    #[test]
    fn flags_override_the_profile() {
        let mut profile = Profile::new("https://mesh.example.com");
        profile.token = Some("from-file".into());
        profile.timeout = Some(10);
        let cfg = config_with("lab", profile);

        let g = global(&["--token", "from-flag", "--timeout", "5", "-k"]);
        let config = resolve(&g, &cfg, &MemoryStore::default()).unwrap();
        assert_eq!(token_of(&config), "from-flag");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn profile_timeout_beats_defaults() {
        let mut profile = Profile::new("https://mesh.example.com");
        profile.token = Some("t".into());
        profile.timeout = Some(10);
        let cfg = config_with("lab", profile);

        let config = resolve(&global(&[]), &cfg, &MemoryStore::default()).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn unknown_requested_profile_lists_the_others() {
        let cfg = config_with("lab", Profile::new("https://mesh.example.com"));
        let err = resolve(&global(&["-p", "prod"]), &cfg, &MemoryStore::default()).unwrap_err();
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "prod");
                assert_eq!(available, "lab");
            }
            other => panic!("expected ProfileNotFound, got {other:?}"),
        }
    }
}
