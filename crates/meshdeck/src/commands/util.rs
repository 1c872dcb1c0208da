//! Shared helpers for command handlers.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;

use meshdeck_core::{Controller, EntityId, ExtendedNode};

use crate::error::CliError;

/// Resolve a node (id or host name) within `network`.
pub fn resolve_node(
    controller: &Controller,
    network: &str,
    identifier: &str,
) -> Result<ExtendedNode, CliError> {
    controller
        .store()
        .resolve_node(network, identifier)
        .ok_or_else(|| {
            CliError::not_found("node", identifier, format!("nodes list --network {network}"))
        })
}

pub fn resolve_node_id(
    controller: &Controller,
    network: &str,
    identifier: &str,
) -> Result<EntityId, CliError> {
    resolve_node(controller, network, identifier).map(|n| n.node.id.clone())
}

/// Resolve every identifier, failing on the first unknown one.
pub fn resolve_node_ids(
    controller: &Controller,
    network: &str,
    identifiers: &[String],
) -> Result<Vec<EntityId>, CliError> {
    identifiers
        .iter()
        .map(|i| resolve_node_id(controller, network, i))
        .collect()
}

/// Resolve a host (id or name).
pub fn resolve_host_id(controller: &Controller, identifier: &str) -> Result<EntityId, CliError> {
    controller
        .store()
        .resolve_host(identifier)
        .map(|h| h.id.clone())
        .ok_or_else(|| CliError::not_found("host", identifier, "hosts list"))
}

/// Parse repeated `NETWORK=ROLE` flags into a role map.
pub fn parse_role_map(pairs: &[String]) -> Result<BTreeMap<String, Vec<String>>, CliError> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in pairs {
        let (network, role) = pair
            .split_once('=')
            .filter(|(n, r)| !n.is_empty() && !r.is_empty())
            .ok_or_else(|| CliError::Validation {
                field: "network-role".into(),
                reason: format!("expected NETWORK=ROLE, got '{pair}'"),
            })?;
        map.entry(network.to_owned())
            .or_default()
            .push(role.to_owned());
    }
    Ok(map)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Read a new secret twice without echo.
pub fn prompt_new_password() -> Result<String, CliError> {
    let first = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    let second = rpassword::prompt_password("Repeat password: ").map_err(prompt_err)?;
    if first != second {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "passwords do not match".into(),
        });
    }
    Ok(first)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

/// Read and parse a JSON request file for `--from-file` flags.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use meshdeck_core::CreateNetworkRequest;

    use super::*;

    #[test]
    fn role_map_groups_by_network() {
        let map = parse_role_map(&[
            "office=network-admin".into(),
            "office=network-user".into(),
            "lab=network-user".into(),
        ])
        .unwrap();
        assert_eq!(map["office"], vec!["network-admin", "network-user"]);
        assert_eq!(map["lab"], vec!["network-user"]);
    }

    #[test]
    fn role_map_rejects_missing_separator() {
        let err = parse_role_map(&["office".into()]).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
        assert!(parse_role_map(&["=admin".into()]).is_err());
    }

    #[test]
    fn json_file_into_request() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name":"office","ipv4_range":"10.101.0.0/16"}}"#).unwrap();

        let req: CreateNetworkRequest = read_json_file(file.path()).unwrap();
        assert_eq!(req.name, "office");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn malformed_json_file_is_a_json_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let err = read_json_file::<CreateNetworkRequest>(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Json(_)));
    }
}
