//! Enrollment key command handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tabled::Tabled;

use meshdeck_core::{
    Command as CoreCommand, CommandResult, CreateEnrollmentKeyRequest, EnrollmentKey,
    EnrollmentKeyType, EntityId, UpdateEnrollmentKeyRequest,
};

use crate::cli::{EnrollmentKeysArgs, EnrollmentKeysCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

#[derive(Tabled)]
struct KeyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Networks")]
    networks: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Token")]
    token: String,
}

/// What bounds the key: a date, a use count, or nothing.
fn limit(k: &EnrollmentKey) -> String {
    match k.key_type {
        EnrollmentKeyType::TimeExpiration => k.expiration.map_or_else(
            || "expires".into(),
            |e| format!("until {}", e.format("%Y-%m-%d %H:%M")),
        ),
        EnrollmentKeyType::Uses => format!("{} use(s) left", k.uses_remaining),
        EnrollmentKeyType::Unlimited => "unlimited".into(),
        EnrollmentKeyType::Undefined => "-".into(),
    }
}

fn row(k: &Arc<EnrollmentKey>) -> KeyRow {
    KeyRow {
        id: k.id.to_string(),
        networks: output::join(&k.networks),
        tags: output::join(&k.tags),
        limit: limit(k),
        token: k.token.clone(),
    }
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CliError::Validation {
            field: "expires".into(),
            reason: format!("expected an RFC 3339 timestamp like 2026-01-31T18:00:00Z ({e})"),
        })
}

pub async fn handle(
    session: &Session,
    args: EnrollmentKeysArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        EnrollmentKeysCommand::List => {
            let controller = session.controller().await?;
            let snap = controller.enrollment_keys_snapshot();
            let out = output::render_list(&global.output, &snap, row, |k| k.token.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EnrollmentKeysCommand::Create {
            networks,
            tags,
            expires,
            uses,
            unlimited,
        } => {
            let req = CreateEnrollmentKeyRequest {
                networks,
                tags,
                expiration: expires.as_deref().map(parse_expiry).transpose()?,
                uses,
                unlimited,
            };
            let result = session
                .execute(CoreCommand::CreateEnrollmentKey(req))
                .await?;
            if let CommandResult::EnrollmentKey(k) = result {
                output::done(&format!("Enrollment key {} created", k.id), global.quiet);
                output::print_output(&k.token, global.quiet);
            }
            Ok(())
        }

        EnrollmentKeysCommand::Update { id, networks, tags } => {
            session
                .execute(CoreCommand::UpdateEnrollmentKey {
                    id: EntityId::from(id.as_str()),
                    update: UpdateEnrollmentKeyRequest { networks, tags },
                })
                .await?;
            output::done(&format!("Enrollment key {id} updated"), global.quiet);
            Ok(())
        }

        EnrollmentKeysCommand::Delete { id } => {
            let prompt = format!("Delete enrollment key {id}? Hosts can no longer join with it.");
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session
                .execute(CoreCommand::DeleteEnrollmentKey {
                    id: EntityId::from(id.as_str()),
                })
                .await?;
            output::done(&format!("Enrollment key {id} deleted"), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn expiry_accepts_offsets() {
        let dt = parse_expiry("2026-01-31T19:00:00+01:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 1, 31, 18, 0, 0).unwrap());
    }

    #[test]
    fn expiry_rejects_plain_dates() {
        assert!(matches!(
            parse_expiry("2026-01-31"),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn limit_by_key_type() {
        let mut key = EnrollmentKey {
            id: EntityId::from("9a8b7c6d-1e2f-4a3b-8c4d-5e6f7a8b9c0d"),
            token: "tok".into(),
            networks: vec!["office".into()],
            tags: Vec::new(),
            expiration: None,
            uses_remaining: 3,
            unlimited: false,
            key_type: EnrollmentKeyType::Uses,
        };
        assert_eq!(limit(&key), "3 use(s) left");
        key.key_type = EnrollmentKeyType::Unlimited;
        assert_eq!(limit(&key), "unlimited");
    }
}
