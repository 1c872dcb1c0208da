// ── Two-step topology changes ──
//
// Moving a relayed node between relays and replacing egress ranges each
// take two writes. When the second write fails the first one is undone
// and the error says whether that worked.

use indexmap::IndexSet;
use ipnet::IpNet;
use tracing::{info, warn};

use meshdeck_api::RestClient;
use meshdeck_api::types::{EgressGatewayRequest, NodeResponse, yes_no};

use crate::error::{Compensation, CoreError};

/// The node endpoints these transactions need.
pub(crate) trait TopologyBackend {
    async fn get_node(
        &self,
        network: &str,
        node_id: &str,
    ) -> Result<NodeResponse, meshdeck_api::Error>;

    async fn update_node(&self, node: &NodeResponse) -> Result<NodeResponse, meshdeck_api::Error>;

    async fn create_egress(
        &self,
        network: &str,
        node_id: &str,
        request: &EgressGatewayRequest,
    ) -> Result<NodeResponse, meshdeck_api::Error>;

    async fn delete_egress(
        &self,
        network: &str,
        node_id: &str,
    ) -> Result<NodeResponse, meshdeck_api::Error>;
}

impl TopologyBackend for RestClient {
    async fn get_node(
        &self,
        network: &str,
        node_id: &str,
    ) -> Result<NodeResponse, meshdeck_api::Error> {
        RestClient::get_node(self, network, node_id).await
    }

    async fn update_node(&self, node: &NodeResponse) -> Result<NodeResponse, meshdeck_api::Error> {
        RestClient::update_node(self, node).await
    }

    async fn create_egress(
        &self,
        network: &str,
        node_id: &str,
        request: &EgressGatewayRequest,
    ) -> Result<NodeResponse, meshdeck_api::Error> {
        RestClient::create_egress(self, network, node_id, request).await
    }

    async fn delete_egress(
        &self,
        network: &str,
        node_id: &str,
    ) -> Result<NodeResponse, meshdeck_api::Error> {
        RestClient::delete_egress(self, network, node_id).await
    }
}

/// Both relays after a successful move.
#[derive(Debug, Clone)]
pub(crate) struct RelayMove {
    pub old_relay: NodeResponse,
    pub new_relay: NodeResponse,
}

/// Move `node_id` from `old_relay`'s relayed set to `new_relay`'s.
pub(crate) async fn reassign_relayed_node<B: TopologyBackend>(
    backend: &B,
    network: &str,
    node_id: &str,
    old_relay: &str,
    new_relay: &str,
) -> Result<RelayMove, CoreError> {
    let original = backend.get_node(network, old_relay).await?;
    let mut detached = original.clone();
    detached.relaynodes.retain(|id| id != node_id);
    let old_after = backend.update_node(&detached).await?;

    match attach_to_relay(backend, network, node_id, new_relay).await {
        Ok(new_after) => {
            info!(node = node_id, from = old_relay, to = new_relay, "relayed node moved");
            Ok(RelayMove {
                old_relay: old_after,
                new_relay: new_after,
            })
        }
        Err(e) => {
            warn!(node = node_id, relay = new_relay, error = %e, "attach failed, restoring previous relay");
            let compensation = match backend.update_node(&original).await {
                Ok(_) => Compensation::Restored,
                Err(undo) => {
                    warn!(relay = old_relay, error = %undo, "could not restore relayed set");
                    Compensation::NotRestored {
                        message: CoreError::from(undo).to_string(),
                    }
                }
            };
            Err(CoreError::PartialFailure {
                step: format!("add {node_id} to relay {new_relay}"),
                message: CoreError::from(e).to_string(),
                compensation,
            })
        }
    }
}

async fn attach_to_relay<B: TopologyBackend>(
    backend: &B,
    network: &str,
    node_id: &str,
    relay: &str,
) -> Result<NodeResponse, meshdeck_api::Error> {
    let mut target = backend.get_node(network, relay).await?;
    if !target.relaynodes.iter().any(|id| id == node_id) {
        target.relaynodes.push(node_id.to_owned());
    }
    backend.update_node(&target).await
}

/// Replace an egress gateway's ranges: delete the gateway, then recreate
/// it with the deduplicated `ranges` and the NAT flag it had. An empty
/// list leaves the node without egress.
///
/// Returns the node as the server last reported it.
pub(crate) async fn replace_egress_ranges<B: TopologyBackend>(
    backend: &B,
    network: &str,
    node_id: &str,
    ranges: &[IpNet],
) -> Result<NodeResponse, CoreError> {
    let current = backend.get_node(network, node_id).await?;
    let nat = current.egressgatewaynatenabled;
    let old_ranges = current.egressgatewayranges.clone();

    let new_ranges: Vec<String> = ranges
        .iter()
        .collect::<IndexSet<_>>()
        .into_iter()
        .map(ToString::to_string)
        .collect();

    let mut latest = current;
    let was_gateway = latest.isegressgateway;
    if was_gateway {
        latest = backend.delete_egress(network, node_id).await?;
    }

    if new_ranges.is_empty() {
        info!(node = node_id, "egress ranges cleared");
        return Ok(latest);
    }

    let request = EgressGatewayRequest {
        ranges: new_ranges,
        natenabled: yes_no(nat).to_owned(),
    };
    match backend.create_egress(network, node_id, &request).await {
        Ok(node) => Ok(node),
        Err(e) if !was_gateway || old_ranges.is_empty() => Err(e.into()),
        Err(e) => {
            warn!(node = node_id, error = %e, "egress recreate failed, restoring previous ranges");
            let restore = EgressGatewayRequest {
                ranges: old_ranges,
                natenabled: yes_no(nat).to_owned(),
            };
            let compensation = match backend.create_egress(network, node_id, &restore).await {
                Ok(_) => Compensation::Restored,
                Err(undo) => {
                    warn!(node = node_id, error = %undo, "could not restore egress gateway");
                    Compensation::NotRestored {
                        message: CoreError::from(undo).to_string(),
                    }
                }
            };
            Err(CoreError::PartialFailure {
                step: "recreate egress gateway".into(),
                message: CoreError::from(e).to_string(),
                compensation,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Get(String),
        Update { id: String, relaynodes: Vec<String> },
        DeleteEgress(String),
        CreateEgress { id: String, ranges: Vec<String>, nat: String },
    }

    type FailWhen = Box<dyn Fn(&Call) -> bool + Send + Sync>;

    struct RecordingBackend {
        nodes: Mutex<HashMap<String, NodeResponse>>,
        calls: Mutex<Vec<Call>>,
        fail_when: FailWhen,
    }

    impl RecordingBackend {
        fn new(nodes: Vec<NodeResponse>, fail_when: FailWhen) -> Self {
            Self {
                nodes: Mutex::new(nodes.into_iter().map(|n| (n.id.clone(), n)).collect()),
                calls: Mutex::new(Vec::new()),
                fail_when,
            }
        }

        fn record(&self, call: Call) -> Result<(), meshdeck_api::Error> {
            let fail = (self.fail_when)(&call);
            self.calls.lock().unwrap().push(call);
            if fail {
                Err(meshdeck_api::Error::Api {
                    status: 500,
                    message: "boom".into(),
                })
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn node(&self, id: &str) -> NodeResponse {
            self.nodes.lock().unwrap()[id].clone()
        }
    }

    impl TopologyBackend for RecordingBackend {
        async fn get_node(
            &self,
            _network: &str,
            node_id: &str,
        ) -> Result<NodeResponse, meshdeck_api::Error> {
            self.record(Call::Get(node_id.into()))?;
            Ok(self.node(node_id))
        }

        async fn update_node(
            &self,
            node: &NodeResponse,
        ) -> Result<NodeResponse, meshdeck_api::Error> {
            self.record(Call::Update {
                id: node.id.clone(),
                relaynodes: node.relaynodes.clone(),
            })?;
            self.nodes
                .lock()
                .unwrap()
                .insert(node.id.clone(), node.clone());
            Ok(node.clone())
        }

        async fn create_egress(
            &self,
            _network: &str,
            node_id: &str,
            request: &EgressGatewayRequest,
        ) -> Result<NodeResponse, meshdeck_api::Error> {
            self.record(Call::CreateEgress {
                id: node_id.into(),
                ranges: request.ranges.clone(),
                nat: request.natenabled.clone(),
            })?;
            let mut nodes = self.nodes.lock().unwrap();
            let node = nodes.get_mut(node_id).unwrap();
            node.isegressgateway = true;
            node.egressgatewayranges.clone_from(&request.ranges);
            node.egressgatewaynatenabled = request.natenabled == "yes";
            Ok(node.clone())
        }

        async fn delete_egress(
            &self,
            _network: &str,
            node_id: &str,
        ) -> Result<NodeResponse, meshdeck_api::Error> {
            self.record(Call::DeleteEgress(node_id.into()))?;
            let mut nodes = self.nodes.lock().unwrap();
            let node = nodes.get_mut(node_id).unwrap();
            node.isegressgateway = false;
            node.egressgatewayranges.clear();
            Ok(node.clone())
        }
    }

    fn never() -> FailWhen {
        Box::new(|_| false)
    }

    fn relay(id: &str, members: &[&str]) -> NodeResponse {
        NodeResponse {
            id: id.into(),
            network: "office".into(),
            isrelay: true,
            relaynodes: members.iter().map(|s| (*s).to_owned()).collect(),
            ..NodeResponse::default()
        }
    }

    fn egress(ranges: &[&str], nat: bool) -> NodeResponse {
        NodeResponse {
            id: "gw".into(),
            network: "office".into(),
            isegressgateway: true,
            egressgatewayranges: ranges.iter().map(|s| (*s).to_owned()).collect(),
            egressgatewaynatenabled: nat,
            ..NodeResponse::default()
        }
    }

    fn nets(raw: &[&str]) -> Vec<IpNet> {
        raw.iter().map(|s| s.parse().unwrap()).collect()
    }

    // ── Relay reassignment ───────────────────────────────────────────

    #[tokio::test]
    async fn reassign_moves_node_between_relays() {
        let backend = RecordingBackend::new(
            vec![relay("relay-a", &["n1", "n2"]), relay("relay-b", &["n3"])],
            never(),
        );

        let moved = reassign_relayed_node(&backend, "office", "n1", "relay-a", "relay-b")
            .await
            .unwrap();

        assert_eq!(moved.old_relay.relaynodes, vec!["n2"]);
        assert_eq!(moved.new_relay.relaynodes, vec!["n3", "n1"]);
        assert_eq!(
            backend.calls(),
            vec![
                Call::Get("relay-a".into()),
                Call::Update {
                    id: "relay-a".into(),
                    relaynodes: vec!["n2".into()]
                },
                Call::Get("relay-b".into()),
                Call::Update {
                    id: "relay-b".into(),
                    relaynodes: vec!["n3".into(), "n1".into()]
                },
            ]
        );
    }

    #[tokio::test]
    async fn reassign_restores_old_relay_when_attach_fails() {
        let backend = RecordingBackend::new(
            vec![relay("relay-a", &["n1"]), relay("relay-b", &[])],
            Box::new(|c| matches!(c, Call::Update { id, .. } if id == "relay-b")),
        );

        let err = reassign_relayed_node(&backend, "office", "n1", "relay-a", "relay-b")
            .await
            .unwrap_err();

        match err {
            CoreError::PartialFailure { compensation, .. } => {
                assert_eq!(compensation, Compensation::Restored);
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
        assert_eq!(backend.node("relay-a").relaynodes, vec!["n1"]);
        assert_eq!(
            backend.calls().last(),
            Some(&Call::Update {
                id: "relay-a".into(),
                relaynodes: vec!["n1".into()]
            })
        );
    }

    #[tokio::test]
    async fn reassign_reports_failed_restore() {
        let backend = RecordingBackend::new(
            vec![relay("relay-a", &["n1"]), relay("relay-b", &[])],
            Box::new(|c| match c {
                Call::Get(id) => id == "relay-b",
                Call::Update { id, relaynodes } => id == "relay-a" && !relaynodes.is_empty(),
                _ => false,
            }),
        );

        let err = reassign_relayed_node(&backend, "office", "n1", "relay-a", "relay-b")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("previous state NOT restored"));
        match err {
            CoreError::PartialFailure {
                compensation: Compensation::NotRestored { message },
                ..
            } => assert!(message.contains("boom"), "{message}"),
            other => panic!("expected an unrestored PartialFailure, got {other:?}"),
        }
        assert!(backend.node("relay-a").relaynodes.is_empty());
    }

    #[tokio::test]
    async fn reassign_first_step_failure_is_plain_error() {
        let backend = RecordingBackend::new(
            vec![relay("relay-a", &["n1"]), relay("relay-b", &[])],
            Box::new(|c| matches!(c, Call::Update { id, .. } if id == "relay-a")),
        );

        let err = reassign_relayed_node(&backend, "office", "n1", "relay-a", "relay-b")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
        assert_eq!(backend.calls().len(), 2);
    }

    // ── Egress replacement ───────────────────────────────────────────

    #[tokio::test]
    async fn egress_update_deletes_then_creates_deduplicated_with_nat() {
        let backend = RecordingBackend::new(vec![egress(&["192.168.1.0/24"], true)], never());

        let node = replace_egress_ranges(
            &backend,
            "office",
            "gw",
            &nets(&["10.20.0.0/16", "172.16.0.0/12", "10.20.0.0/16"]),
        )
        .await
        .unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                Call::Get("gw".into()),
                Call::DeleteEgress("gw".into()),
                Call::CreateEgress {
                    id: "gw".into(),
                    ranges: vec!["10.20.0.0/16".into(), "172.16.0.0/12".into()],
                    nat: "yes".into(),
                },
            ]
        );
        assert!(node.isegressgateway);
    }

    #[tokio::test]
    async fn egress_update_preserves_disabled_nat() {
        let backend = RecordingBackend::new(vec![egress(&["192.168.1.0/24"], false)], never());

        replace_egress_ranges(&backend, "office", "gw", &nets(&["10.0.0.0/8"]))
            .await
            .unwrap();

        assert!(backend.calls().iter().any(|c| matches!(
            c,
            Call::CreateEgress { nat, .. } if nat == "no"
        )));
    }

    #[tokio::test]
    async fn egress_update_with_no_ranges_only_deletes() {
        let backend = RecordingBackend::new(vec![egress(&["192.168.1.0/24"], true)], never());

        let node = replace_egress_ranges(&backend, "office", "gw", &[])
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![Call::Get("gw".into()), Call::DeleteEgress("gw".into())]
        );
        assert!(!node.isegressgateway);
    }

    #[tokio::test]
    async fn egress_recreate_failure_restores_old_ranges() {
        let backend = RecordingBackend::new(
            vec![egress(&["192.168.1.0/24"], true)],
            Box::new(|c| {
                matches!(c, Call::CreateEgress { ranges, .. } if ranges[0] == "10.0.0.0/8")
            }),
        );

        let err = replace_egress_ranges(&backend, "office", "gw", &nets(&["10.0.0.0/8"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::PartialFailure {
                compensation: Compensation::Restored,
                ..
            }
        ));
        let node = backend.node("gw");
        assert!(node.isegressgateway);
        assert_eq!(node.egressgatewayranges, vec!["192.168.1.0/24"]);
        assert!(node.egressgatewaynatenabled);
    }

    #[tokio::test]
    async fn egress_failed_restore_carries_the_undo_error() {
        let backend = RecordingBackend::new(
            vec![egress(&["192.168.1.0/24"], true)],
            Box::new(|c| matches!(c, Call::CreateEgress { .. })),
        );

        let err = replace_egress_ranges(&backend, "office", "gw", &nets(&["10.0.0.0/8"]))
            .await
            .unwrap_err();

        let CoreError::PartialFailure { compensation, .. } = err else {
            panic!("expected PartialFailure");
        };
        assert!(!compensation.is_restored());
        assert!(compensation.to_string().contains("boom"), "{compensation}");
        assert!(!backend.node("gw").isegressgateway);
    }
}
