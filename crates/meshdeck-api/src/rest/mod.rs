// Controller REST API
//
// `client` owns transport mechanics; every other module adds endpoint
// wrappers to `RestClient` for one resource family.

mod acls;
mod auth;
pub mod client;
mod dns;
mod enrollment_keys;
mod ext_clients;
mod gateways;
mod hosts;
mod networks;
mod nodes;
mod server;
mod tags;
mod users;

pub use client::RestClient;
