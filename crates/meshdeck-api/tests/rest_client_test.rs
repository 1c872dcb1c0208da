#![allow(clippy::unwrap_used)]
// Integration tests for `RestClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meshdeck_api::types::{CreateRelayRequest, DnsEntryResponse, EgressGatewayRequest};
use meshdeck_api::{Error, RestClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = RestClient::with_client(reqwest::Client::new(), base_url).unwrap();
    client.set_token(SecretString::from("test-token".to_owned()));
    (server, client)
}

/// A client pointed at a port nothing is listening on.
async fn unreachable_client() -> RestClient {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    drop(server);
    RestClient::with_client(reqwest::Client::new(), base_url).unwrap()
}

async fn mount_error(server: &MockServer, verb: &str, route: &str) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "Code": 500, "Message": "database unavailable" })),
        )
        .mount(server)
        .await;
}

fn assert_server_error<T: std::fmt::Debug>(result: Result<T, Error>) {
    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

fn assert_transport_error<T: std::fmt::Debug>(result: Result<T, Error>) {
    assert!(
        matches!(result, Err(Error::Transport(_))),
        "expected Transport error, got: {result:?}"
    );
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_installs_token() {
    let server = MockServer::start().await;
    let client =
        RestClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap())
            .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/users/adm/authenticate"))
        .and(body_json(json!({ "username": "admin", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Code": 200,
            "Message": "W1R3: Device admin Authorized",
            "Response": { "AuthToken": "jwt-abc", "UserName": "admin" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/networks"))
        .and(header("Authorization", "Bearer jwt-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let password = SecretString::from("hunter2".to_owned());
    client.login("admin", &password).await.unwrap();
    assert!(client.has_token());

    let networks = client.list_networks().await.unwrap();
    assert!(networks.is_empty());
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let server = MockServer::start().await;
    let client =
        RestClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap())
            .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/users/adm/authenticate"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "Code": 401, "Message": "incorrect credentials" })),
        )
        .mount(&server)
        .await;

    let password = SecretString::from("wrong".to_owned());
    let result = client.login("admin", &password).await;

    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "incorrect credentials"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_bearer_header_sent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hosts"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client.list_hosts().await.unwrap();
}

// ── Hosts ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_hosts_ok() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hosts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "6f1c9e4a-8c1a-4b4e-9d55-0d2f0b6a7c11",
            "name": "edge-01",
            "os": "linux",
            "version": "v0.30.0",
            "endpointip": "203.0.113.10",
            "listenport": 51821,
            "nat_type": "symmetric",
            "nodes": ["a1", "b2"]
        }])))
        .mount(&server)
        .await;

    let hosts = client.list_hosts().await.unwrap();

    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].name, "edge-01");
    assert_eq!(hosts[0].listenport, 51821);
    assert_eq!(hosts[0].nat_type, "symmetric");
    assert_eq!(hosts[0].nodes, vec!["a1".to_owned(), "b2".to_owned()]);
}

#[tokio::test]
async fn test_list_hosts_server_error() {
    let (server, client) = setup().await;
    mount_error(&server, "GET", "/api/hosts").await;
    assert_server_error(client.list_hosts().await);
}

#[tokio::test]
async fn test_list_hosts_network_error() {
    let client = unreachable_client().await;
    assert_transport_error(client.list_hosts().await);
}

// ── Networks ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_networks_ok() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/networks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "netid": "office",
            "addressrange": "10.101.0.0/16",
            "addressrange6": "",
            "defaultacl": "yes",
            "defaultkeepalive": 20
        }])))
        .mount(&server)
        .await;

    let networks = client.list_networks().await.unwrap();

    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0].netid, "office");
    assert_eq!(networks[0].addressrange, "10.101.0.0/16");
    assert_eq!(networks[0].defaultacl, "yes");
}

#[tokio::test]
async fn test_list_networks_null_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/networks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    assert!(client.list_networks().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_networks_server_error() {
    let (server, client) = setup().await;
    mount_error(&server, "GET", "/api/networks").await;
    assert_server_error(client.list_networks().await);
}

#[tokio::test]
async fn test_list_networks_network_error() {
    let client = unreachable_client().await;
    assert_transport_error(client.list_networks().await);
}

#[tokio::test]
async fn test_delete_network_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/networks/ghost"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "Code": 404, "Message": "network not found" })),
        )
        .mount(&server)
        .await;

    let err = client.delete_network("ghost").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "API error (HTTP 404): network not found");
}

// ── Nodes ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_nodes_ok() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "a1",
            "hostid": "6f1c9e4a-8c1a-4b4e-9d55-0d2f0b6a7c11",
            "network": "office",
            "address": "10.101.0.1/32",
            "connected": true,
            "status": "online",
            "isrelay": true,
            "relaynodes": ["b2"]
        }])))
        .mount(&server)
        .await;

    let nodes = client.list_nodes().await.unwrap();

    assert_eq!(nodes.len(), 1);
    assert!(nodes[0].isrelay);
    assert_eq!(nodes[0].relaynodes, vec!["b2".to_owned()]);
    assert_eq!(nodes[0].status, "online");
}

#[tokio::test]
async fn test_list_nodes_server_error() {
    let (server, client) = setup().await;
    mount_error(&server, "GET", "/api/nodes").await;
    assert_server_error(client.list_nodes().await);
}

#[tokio::test]
async fn test_list_nodes_network_error() {
    let client = unreachable_client().await;
    assert_transport_error(client.list_nodes().await);
}

// ── Users ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_users_ok() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "username": "alice",
            "issuperadmin": true,
            "platform_role_id": "super-admin",
            "network_roles": null,
            "user_group_ids": { "ops": {} }
        }])))
        .mount(&server)
        .await;

    let users = client.list_users().await.unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "alice");
    assert!(users[0].issuperadmin);
    assert!(users[0].network_roles.is_empty());
    assert!(users[0].user_group_ids.contains_key("ops"));
}

#[tokio::test]
async fn test_list_users_server_error() {
    let (server, client) = setup().await;
    mount_error(&server, "GET", "/api/users").await;
    assert_server_error(client.list_users().await);
}

#[tokio::test]
async fn test_list_users_network_error() {
    let client = unreachable_client().await;
    assert_transport_error(client.list_users().await);
}

// ── Gateways ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_relay_posts_relayed_ids() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/nodes/office/a1/createrelay"))
        .and(body_json(json!({
            "netid": "office",
            "nodeid": "a1",
            "relayaddrs": ["b2", "c3"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "network": "office",
            "isrelay": true,
            "relaynodes": ["b2", "c3"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let node = client
        .create_relay(&CreateRelayRequest {
            netid: "office".into(),
            nodeid: "a1".into(),
            relayaddrs: vec!["b2".into(), "c3".into()],
        })
        .await
        .unwrap();

    assert!(node.isrelay);
    assert_eq!(node.relaynodes.len(), 2);
}

#[tokio::test]
async fn test_create_egress_sends_yes_no_nat() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/nodes/office/a1/creategateway"))
        .and(body_json(json!({ "ranges": ["192.168.50.0/24"], "natenabled": "yes" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "network": "office",
            "isegressgateway": true,
            "egressgatewayranges": ["192.168.50.0/24"],
            "egressgatewaynatenabled": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let node = client
        .create_egress(
            "office",
            "a1",
            &EgressGatewayRequest {
                ranges: vec!["192.168.50.0/24".into()],
                natenabled: "yes".into(),
            },
        )
        .await
        .unwrap();

    assert!(node.isegressgateway);
    assert!(node.egressgatewaynatenabled);
}

#[tokio::test]
async fn test_delete_ingress() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/nodes/office/a1/deleteingress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "network": "office",
            "isingressgateway": false
        })))
        .mount(&server)
        .await;

    let node = client.delete_ingress("office", "a1").await.unwrap();
    assert!(!node.isingressgateway);
}

// ── Envelope-wrapped v1 endpoints ───────────────────────────────────

#[tokio::test]
async fn test_list_tags_unwraps_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .and(query_param("network", "office"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Code": 200,
            "Message": "fetched tags office",
            "Response": [{
                "id": "office.web",
                "tag_name": "web",
                "network": "office",
                "tagged_nodes": [{ "id": "a1" }],
                "used_by_count": 1
            }]
        })))
        .mount(&server)
        .await;

    let tags = client.list_tags("office").await.unwrap();

    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].tag_name, "web");
    assert_eq!(tags[0].tagged_nodes[0].id, "a1");
}

#[tokio::test]
async fn test_delete_acl_uses_query_param() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/acls"))
        .and(query_param("acl_id", "acl-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Code": 200 })))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_acl("acl-7").await.unwrap();
}

// ── DNS and ext clients ─────────────────────────────────────────────

#[tokio::test]
async fn test_create_dns_entry() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/dns/office"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "nas",
            "address": "10.101.0.50",
            "network": "office"
        })))
        .mount(&server)
        .await;

    let entry = client
        .create_dns(
            "office",
            &DnsEntryResponse {
                name: "nas".into(),
                address: "10.101.0.50".into(),
                network: "office".into(),
                ..DnsEntryResponse::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(entry.name, "nas");
}

#[tokio::test]
async fn test_ext_client_config_is_plain_text() {
    let (server, client) = setup().await;

    let conf = "[Interface]\nAddress = 10.101.0.200/32\n";
    Mock::given(method("GET"))
        .and(path("/api/extclients/office/laptop/file"))
        .respond_with(ResponseTemplate::new(200).set_body_string(conf))
        .mount(&server)
        .await;

    let text = client.get_ext_client_config("office", "laptop").await.unwrap();
    assert_eq!(text, conf);
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/server/getconfig"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let err = client.get_server_config().await.unwrap_err();
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hosts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let result = client.list_hosts().await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>proxy</html>"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}
