//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};
use secrecy::SecretString;

use meshdeck_config::{KeyringStore, SecretStore};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretKindArg};
use crate::config::{self, AuthMode, Config, Profile, SecretKind};
use crate::error::CliError;
use crate::output;

use super::util;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// A copy of the config with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(MASK.into());
        }
        if profile.password.is_some() {
            profile.password = Some(MASK.into());
        }
    }
    cfg
}

/// TOML-like rendering of an already-redacted config.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();
    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out, "\n[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out, "\n[profiles.{name}]");
        let _ = writeln!(out, "server = \"{}\"", p.server);
        let _ = writeln!(out, "auth_mode = \"{}\"", p.auth_mode);
        let optional = [
            ("token", p.token.clone()),
            ("token_env", p.token_env.clone()),
            ("username", p.username.clone()),
            ("password", p.password.clone()),
            ("ca_cert", p.ca_cert.as_ref().map(|c| c.display().to_string())),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                let _ = writeln!(out, "{key} = \"{v}\"");
            }
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }
    out.trim_end().to_owned()
}

/// Ask where a secret goes. Returns it back when the user picks the
/// config file, `None` once it is in the keyring.
fn store_secret(
    profile_name: &str,
    kind: SecretKind,
    secret: String,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = [
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where should the {label} be stored?"))
        .items(&choices)
        .default(0)
        .interact()
        .map_err(util::prompt_err)?;

    if selection == 0 {
        KeyringStore.set(profile_name, kind, &SecretString::from(secret))?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

fn prompt_secret(prompt: &str, field: &str) -> Result<String, CliError> {
    let secret = rpassword::prompt_password(prompt).map_err(util::prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(secret)
}

fn init() -> Result<(), CliError> {
    let path = config::config_path();
    eprintln!("meshdeck configuration");
    eprintln!("   Config path: {}\n", path.display());

    let mut cfg = config::load_config_or_default();

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(util::prompt_err)?;

    let server: String = Input::new()
        .with_prompt("Server API URL")
        .validate_with(|s: &String| {
            meshdeck_config::parse_server_url(s)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(util::prompt_err)?;

    let auth_choices = ["Token or master key", "Username and password"];
    let auth = Select::new()
        .with_prompt("Authentication")
        .items(&auth_choices)
        .default(0)
        .interact()
        .map_err(util::prompt_err)?;

    let mut profile = Profile::new(server);
    if auth == 0 {
        let token = prompt_secret("Token: ", "token")?;
        profile.auth_mode = AuthMode::Token;
        profile.token = store_secret(&profile_name, SecretKind::Token, token, "token")?;
    } else {
        let username: String = Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(util::prompt_err)?;
        let password = prompt_secret("Password: ", "password")?;
        profile.auth_mode = AuthMode::Password;
        profile.username = Some(username);
        profile.password = store_secret(&profile_name, SecretKind::Password, password, "password")?;
    }

    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let written = config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: meshdeck server info");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(Profile::default);
            profile.set(&key, &value)?;
            config::save_config(&cfg)?;
            output::done(&format!("Set {key} on profile '{profile_name}'"), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: meshdeck config init");
                return Ok(());
            }
            let default = cfg.default_profile.as_deref().unwrap_or_default();
            let lines: Vec<String> = cfg
                .profiles
                .iter()
                .map(|(name, p)| {
                    let marker = if name == default { " *" } else { "" };
                    format!("{name}{marker}\t{}", p.server)
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            config::require_profile(&cfg, &name)?;
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::done(&format!("Default profile set to '{name}'"), global.quiet);
            Ok(())
        }

        ConfigCommand::SetSecret { kind } => {
            let cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            config::require_profile(&cfg, &profile_name)?;

            let (kind, label) = match kind {
                SecretKindArg::Token => (SecretKind::Token, "Token"),
                SecretKindArg::Password => (SecretKind::Password, "Password"),
            };
            let secret = prompt_secret(&format!("{label}: "), &label.to_lowercase())?;
            KeyringStore.set(&profile_name, kind, &SecretString::from(secret))?;
            output::done(
                &format!("{label} stored in keyring for profile '{profile_name}'"),
                global.quiet,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let mut profile = Profile::new("https://mesh.example.com");
        profile.token = Some("secret-token".into());
        profile.timeout = Some(15);
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile);
        cfg
    }

    #[test]
    fn secrets_are_masked() {
        let cfg = redacted(&sample());
        assert_eq!(cfg.profiles["default"].token.as_deref(), Some(MASK));
        let text = format_config(&cfg);
        assert!(!text.contains("secret-token"));
        assert!(text.contains("[profiles.default]"));
        assert!(text.contains("server = \"https://mesh.example.com\""));
        assert!(text.contains("timeout = 15"));
    }

    #[test]
    fn redacted_json_hides_the_token() {
        let json = serde_json::to_string(&redacted(&sample())).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(json.contains("\"server\":\"https://mesh.example.com\""));
    }
}
