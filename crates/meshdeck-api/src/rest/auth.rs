// Login flow
//
// Trades a username/password for a bearer token and installs it on the
// client so every later call is authenticated.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::auth::Credentials;
use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::{AuthRequest, AuthResponse, Envelope};

impl RestClient {
    /// Authenticate with username and password.
    ///
    /// `POST /api/users/adm/authenticate`. On success the returned token is
    /// installed on this client and also handed back so callers can cache it.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, Error> {
        debug!(username, "logging in");

        let body = AuthRequest {
            username,
            password: password.expose_secret(),
        };
        let envelope: Envelope<AuthResponse> = self
            .post(&["api", "users", "adm", "authenticate"], &body)
            .await
            .map_err(|e| match e {
                Error::Api { status: 400 | 403, message } => Error::Authentication { message },
                other => other,
            })?;

        let auth = Self::unwrap_envelope(envelope);
        if auth.auth_token.is_empty() {
            return Err(Error::Authentication {
                message: "server returned an empty token".into(),
            });
        }

        let token = SecretString::from(auth.auth_token);
        self.set_token(token.clone());
        info!(user = %auth.user_name, "authenticated");
        Ok(token)
    }

    /// Apply a set of credentials: install a token directly, or log in.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<(), Error> {
        match credentials {
            Credentials::Token(token) => {
                self.set_token(token.clone());
                Ok(())
            }
            Credentials::Password { username, password } => {
                self.login(username, password).await.map(|_| ())
            }
        }
    }
}
