// meshdeck-api: Async Rust client for the overlay-network controller REST API

pub mod auth;
pub mod error;
pub mod rest;
pub mod transport;
pub mod types;

pub use auth::Credentials;
pub use error::{Error, extract_error_message};
pub use rest::RestClient;
pub use transport::{TlsMode, TransportConfig};
