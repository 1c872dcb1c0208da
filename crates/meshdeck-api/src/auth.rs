use secrecy::SecretString;

/// Credentials for authenticating with a controller.
///
/// Each variant carries the secret material needed for its auth flow.
/// Both end up as a bearer token on the wire; the password variant has
/// to trade its secret for one first.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A pre-issued bearer token (master key or an earlier session token).
    Token(SecretString),

    /// Username/password exchanged for a token at
    /// `POST /api/users/adm/authenticate`.
    Password {
        username: String,
        password: SecretString,
    },
}

impl Credentials {
    /// Whether a login round-trip is needed before authenticated calls.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Password { .. })
    }
}
