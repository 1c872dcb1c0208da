// ── Local input validation ──
//
// Checks run before any request leaves the process. Each failure names
// the offending field so the CLI can report `field: reason` lines.

use std::fmt;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every field error found in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    /// Record the error from a single-field check, if any.
    pub fn check(&mut self, result: Result<(), FieldError>) {
        if let Err(e) = result {
            self.0.push(e);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn field_err(field: &str, reason: impl Into<String>) -> FieldError {
    FieldError {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

// ── Names ────────────────────────────────────────────────────────────

pub const MAX_NETWORK_NAME_LEN: usize = 32;

/// Network ids: 1-32 lowercase letters, digits or `-`, no leading or
/// trailing `-`.
pub fn network_name(field: &str, name: &str) -> Result<(), FieldError> {
    if name.is_empty() {
        return Err(field_err(field, "is required"));
    }
    if name.len() > MAX_NETWORK_NAME_LEN {
        return Err(field_err(
            field,
            format!("must be at most {MAX_NETWORK_NAME_LEN} characters"),
        ));
    }
    if !name.chars().all(is_slug_char) {
        return Err(field_err(
            field,
            "may only contain lowercase letters, digits and '-'",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(field_err(field, "must not start or end with '-'"));
    }
    Ok(())
}

/// Usernames: 3-40 characters of letters, digits, `.`, `_`, `-`, `@`.
/// A username containing `@` must also be a valid email address.
pub fn username(field: &str, name: &str) -> Result<(), FieldError> {
    if name.len() < 3 || name.len() > 40 {
        return Err(field_err(field, "must be 3-40 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
    {
        return Err(field_err(
            field,
            "may only contain letters, digits, '.', '_', '-' and '@'",
        ));
    }
    if name.contains('@') {
        email(field, name)?;
    }
    Ok(())
}

/// A pragmatic address check: one `@`, non-empty local part, dotted domain.
pub fn email(field: &str, value: &str) -> Result<(), FieldError> {
    let invalid = || field_err(field, "is not a valid email address");
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

/// Tag and group names: 1-64 letters, digits, `-` or `_`.
pub fn label(field: &str, value: &str) -> Result<(), FieldError> {
    if value.is_empty() || value.len() > 64 {
        return Err(field_err(field, "must be 1-64 characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(field_err(
            field,
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

/// External client ids double as WireGuard config file names.
pub fn client_id(field: &str, value: &str) -> Result<(), FieldError> {
    if value.is_empty() || value.len() > 32 {
        return Err(field_err(field, "must be 1-32 characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(field_err(field, "may only contain letters, digits and '-'"));
    }
    Ok(())
}

/// DNS names: dot-separated labels of 1-63 letters, digits or `-`.
pub fn dns_name(field: &str, value: &str) -> Result<(), FieldError> {
    if value.is_empty() || value.len() > 253 {
        return Err(field_err(field, "must be 1-253 characters"));
    }
    for part in value.split('.') {
        if part.is_empty() || part.len() > 63 {
            return Err(field_err(field, "each label must be 1-63 characters"));
        }
        if !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            || part.starts_with('-')
            || part.ends_with('-')
        {
            return Err(field_err(
                field,
                "labels may only contain letters, digits and inner '-'",
            ));
        }
    }
    Ok(())
}

pub fn required(field: &str, value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        Err(field_err(field, "is required"))
    } else {
        Ok(())
    }
}

// ── Addresses ────────────────────────────────────────────────────────

/// Parse a CIDR string, naming the field on failure.
pub fn cidr(field: &str, value: &str) -> Result<IpNet, FieldError> {
    value
        .trim()
        .parse::<IpNet>()
        .map_err(|_| field_err(field, format!("'{value}' is not a valid CIDR")))
}

pub fn ipv4_cidr(field: &str, value: &str) -> Result<Ipv4Net, FieldError> {
    match cidr(field, value)? {
        IpNet::V4(net) => Ok(net),
        IpNet::V6(_) => Err(field_err(field, "must be an IPv4 range")),
    }
}

pub fn ipv6_cidr(field: &str, value: &str) -> Result<Ipv6Net, FieldError> {
    match cidr(field, value)? {
        IpNet::V6(net) => Ok(net),
        IpNet::V4(_) => Err(field_err(field, "must be an IPv6 range")),
    }
}

/// Parse a list of CIDRs; reports the first bad entry.
pub fn cidr_list(field: &str, values: &[String]) -> Result<Vec<IpNet>, FieldError> {
    values.iter().map(|v| cidr(field, v)).collect()
}

/// Networks need at least one address family.
pub fn address_ranges(
    ipv4: Option<&str>,
    ipv6: Option<&str>,
) -> Result<(Option<Ipv4Net>, Option<Ipv6Net>), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let ipv4 = ipv4.filter(|s| !s.trim().is_empty());
    let ipv6 = ipv6.filter(|s| !s.trim().is_empty());

    if ipv4.is_none() && ipv6.is_none() {
        errors.push("ipv4_range", "at least one of IPv4 or IPv6 range is required");
        return Err(errors);
    }

    let v4 = match ipv4.map(|s| ipv4_cidr("ipv4_range", s)).transpose() {
        Ok(v) => v,
        Err(e) => {
            errors.check(Err(e));
            None
        }
    };
    let v6 = match ipv6.map(|s| ipv6_cidr("ipv6_range", s)).transpose() {
        Ok(v) => v,
        Err(e) => {
            errors.check(Err(e));
            None
        }
    };

    errors.into_result().map(|()| (v4, v6))
}

pub fn port(field: &str, value: u32) -> Result<(), FieldError> {
    if (1..=65_535).contains(&value) {
        Ok(())
    } else {
        Err(field_err(field, "must be between 1 and 65535"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn network_name_rules() {
        assert!(network_name("name", "office-1").is_ok());
        assert!(network_name("name", "").is_err());
        assert!(network_name("name", "Office").is_err());
        assert!(network_name("name", "-office").is_err());
        assert!(network_name("name", &"a".repeat(33)).is_err());
    }

    #[test]
    fn username_with_at_must_be_email() {
        assert!(username("username", "alice").is_ok());
        assert!(username("username", "alice@example.com").is_ok());
        assert!(username("username", "alice@example").is_err());
        assert!(username("username", "al").is_err());
        assert!(username("username", "ali ce").is_err());
    }

    #[test]
    fn email_rules() {
        assert!(email("email", "ops@mesh.example.org").is_ok());
        assert!(email("email", "@example.com").is_err());
        assert!(email("email", "ops@@example.com").is_err());
        assert!(email("email", "ops@example.").is_err());
    }

    #[test]
    fn cidr_parsing_names_field() {
        assert!(cidr("range", "10.0.0.0/24").is_ok());
        let err = cidr("range", "10.0.0.0/33").unwrap_err();
        assert_eq!(err.field, "range");
        assert!(ipv4_cidr("range", "fd00::/64").is_err());
        assert!(ipv6_cidr("range", "fd00::/64").is_ok());
    }

    #[test]
    fn address_ranges_needs_one_family() {
        let err = address_ranges(None, Some("  ")).unwrap_err();
        assert_eq!(err.errors().len(), 1);

        let (v4, v6) = address_ranges(Some("10.101.0.0/16"), None).unwrap();
        assert!(v4.is_some());
        assert!(v6.is_none());
    }

    #[test]
    fn address_ranges_reports_every_bad_field() {
        let err = address_ranges(Some("nope"), Some("10.0.0.0/8")).unwrap_err();
        let fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["ipv4_range", "ipv6_range"]);
        assert_eq!(
            err.to_string(),
            "ipv4_range: 'nope' is not a valid CIDR; ipv6_range: must be an IPv6 range"
        );
    }

    #[test]
    fn dns_names() {
        assert!(dns_name("name", "nas.office").is_ok());
        assert!(dns_name("name", "nas..office").is_err());
        assert!(dns_name("name", "-nas").is_err());
    }
}
