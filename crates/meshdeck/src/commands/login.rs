//! `meshdeck login`: exchange a username and password for a bearer token.

use std::time::Duration;

use dialoguer::Input;
use secrecy::{ExposeSecret, SecretString};

use meshdeck_config::{KeyringStore, SecretStore};
use meshdeck_core::{AuthCredentials, Controller, ControllerConfig, TlsVerification};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::{self, AuthMode, Config, Profile, SecretKind};
use crate::error::CliError;
use crate::output;

use super::util;

fn login_config(
    global: &GlobalOpts,
    cfg: &Config,
    profile: Option<&Profile>,
    username: String,
    password: SecretString,
) -> Result<ControllerConfig, CliError> {
    let server = global
        .server
        .as_deref()
        .or(profile.map(|p| p.server.as_str()))
        .ok_or_else(|| CliError::NoConfig {
            path: config::config_path().display().to_string(),
        })?;
    let url = meshdeck_config::parse_server_url(server)?;

    let mut controller_config =
        ControllerConfig::new(url, AuthCredentials::Credentials { username, password });
    controller_config.tls = match profile {
        _ if global.insecure => TlsVerification::DangerAcceptInvalid,
        Some(p) => meshdeck_config::profile_tls(p, &cfg.defaults),
        None if cfg.defaults.insecure => TlsVerification::DangerAcceptInvalid,
        None => TlsVerification::SystemDefaults,
    };
    controller_config.timeout = Duration::from_secs(
        global
            .timeout
            .or(profile.and_then(|p| p.timeout))
            .unwrap_or(cfg.defaults.timeout),
    );
    Ok(controller_config)
}

pub async fn handle(args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config()?;
    let profile_name = config::active_profile_name(global, &cfg);
    let profile = cfg.profiles.get(&profile_name).cloned();

    let username = match args
        .username
        .or_else(|| profile.as_ref().and_then(|p| p.username.clone()))
    {
        Some(u) => u,
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(util::prompt_err)?,
    };
    let password = rpassword::prompt_password("Password: ").map_err(util::prompt_err)?;
    if username.is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let controller_config = login_config(
        global,
        &cfg,
        profile.as_ref(),
        username.clone(),
        SecretString::from(password),
    )?;
    let server = controller_config.url.to_string();
    let token = Controller::login(&controller_config).await?;
    tracing::info!(%server, %username, "logged in");

    if !args.save {
        output::print_output(token.expose_secret(), false);
        return Ok(());
    }

    if profile.is_none() {
        let mut new_profile = Profile::new(server.trim_end_matches('/'));
        new_profile.auth_mode = AuthMode::Password;
        new_profile.username = Some(username);
        cfg.profiles.insert(profile_name.clone(), new_profile);
        if cfg.default_profile.is_none() {
            cfg.default_profile = Some(profile_name.clone());
        }
        config::save_config(&cfg)?;
    }
    KeyringStore.set(&profile_name, SecretKind::Token, &token)?;
    output::done(
        &format!("Logged in; token saved for profile '{profile_name}'"),
        global.quiet,
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["meshdeck"];
        argv.extend_from_slice(args);
        argv.push("login");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn secret() -> SecretString {
        SecretString::from("hunter22".to_owned())
    }

    #[test]
    fn server_flag_without_profile() {
        let config = login_config(
            &global(&["--server", "https://mesh.example.com"]),
            &Config::default(),
            None,
            "admin".into(),
            secret(),
        )
        .unwrap();
        assert_eq!(config.url.as_str(), "https://mesh.example.com/");
        assert!(matches!(
            config.auth,
            AuthCredentials::Credentials { ref username, .. } if username == "admin"
        ));
    }

    #[test]
    fn profile_settings_apply() {
        let mut profile = Profile::new("https://mesh.example.com");
        profile.insecure = Some(true);
        profile.timeout = Some(12);
        let config = login_config(
            &global(&[]),
            &Config::default(),
            Some(&profile),
            "admin".into(),
            secret(),
        )
        .unwrap();
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    fn nothing_to_connect_to() {
        let err = login_config(&global(&[]), &Config::default(), None, "a".into(), secret())
            .unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }
}
