// ── Guided network setup ──
//
// A fixed sequence of questions. The renderer (dialoguer in the CLI) asks
// whatever `SetupState::step` describes and feeds answers back; once the
// review step is confirmed the answers compile into an ordered command
// plan.

use indexmap::IndexMap;
use strum::Display;

use crate::command::Command;
use crate::command::requests::{
    CreateEgressRequest, CreateEnrollmentKeyRequest, CreateIngressRequest, CreateNetworkRequest,
    NodeTarget,
};
use crate::model::{DefaultAclPolicy, EntityId};
use crate::validate::{self, FieldError, ValidationErrors};

pub const DEFAULT_ADDRESS_RANGE: &str = "10.101.0.0/16";

/// Wizard steps in the order they are normally visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StepId {
    NetworkName,
    AddressRange,
    UseGateway,
    GatewayHost,
    RemoteAccess,
    EgressRanges,
    InternetGateway,
    EnrollmentKey,
    Review,
    Done,
    Cancelled,
}

/// What kind of input a step wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Text {
        default: Option<&'static str>,
        optional: bool,
    },
    Confirm {
        default: bool,
    },
    /// One of the hosts known to the store.
    HostChoice,
}

#[derive(Debug, Clone, Copy)]
pub struct StepDescriptor {
    pub id: StepId,
    pub prompt: &'static str,
    pub help: &'static str,
    pub kind: AnswerKind,
}

static STEPS: &[StepDescriptor] = &[
    StepDescriptor {
        id: StepId::NetworkName,
        prompt: "Network name",
        help: "Lowercase letters, digits and hyphens; at most 32 characters.",
        kind: AnswerKind::Text {
            default: None,
            optional: false,
        },
    },
    StepDescriptor {
        id: StepId::AddressRange,
        prompt: "IPv4 address range",
        help: "Private CIDR that node addresses are allocated from.",
        kind: AnswerKind::Text {
            default: Some(DEFAULT_ADDRESS_RANGE),
            optional: false,
        },
    },
    StepDescriptor {
        id: StepId::UseGateway,
        prompt: "Set up a gateway host now?",
        help: "A gateway host gives remote clients and outside networks a way in.",
        kind: AnswerKind::Confirm { default: true },
    },
    StepDescriptor {
        id: StepId::GatewayHost,
        prompt: "Gateway host",
        help: "The host joins the new network and takes the gateway roles chosen next.",
        kind: AnswerKind::HostChoice,
    },
    StepDescriptor {
        id: StepId::RemoteAccess,
        prompt: "Allow remote-access clients through this host?",
        help: "Makes the host an ingress gateway for external clients.",
        kind: AnswerKind::Confirm { default: true },
    },
    StepDescriptor {
        id: StepId::EgressRanges,
        prompt: "Egress ranges (comma separated, blank for none)",
        help: "Outside networks reachable through the gateway, e.g. 192.168.1.0/24.",
        kind: AnswerKind::Text {
            default: None,
            optional: true,
        },
    },
    StepDescriptor {
        id: StepId::InternetGateway,
        prompt: "Route internet traffic through this host?",
        help: "Makes the host an internet gateway; clients are attached later.",
        kind: AnswerKind::Confirm { default: false },
    },
    StepDescriptor {
        id: StepId::EnrollmentKey,
        prompt: "Create an enrollment key for new hosts?",
        help: "An unlimited key that joins hosts to this network.",
        kind: AnswerKind::Confirm { default: true },
    },
    StepDescriptor {
        id: StepId::Review,
        prompt: "Apply this plan?",
        help: "Nothing has been changed on the server yet.",
        kind: AnswerKind::Confirm { default: true },
    },
];

/// Descriptor for `id`; `None` for the terminal states.
pub fn descriptor(id: StepId) -> Option<&'static StepDescriptor> {
    STEPS.iter().find(|s| s.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Bool(bool),
    /// Host id picked from a list.
    Choice(String),
}

impl Answer {
    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s),
            Self::Bool(_) => None,
        }
    }
}

/// The step after `current`, given its answer.
pub fn next_step(current: StepId, answer: &Answer) -> StepId {
    match current {
        StepId::NetworkName => StepId::AddressRange,
        StepId::AddressRange => StepId::UseGateway,
        StepId::UseGateway => {
            if answer.as_bool() == Some(false) {
                StepId::EnrollmentKey
            } else {
                StepId::GatewayHost
            }
        }
        StepId::GatewayHost => StepId::RemoteAccess,
        StepId::RemoteAccess => StepId::EgressRanges,
        StepId::EgressRanges => StepId::InternetGateway,
        StepId::InternetGateway => StepId::EnrollmentKey,
        StepId::EnrollmentKey => StepId::Review,
        StepId::Review => {
            if answer.as_bool() == Some(true) {
                StepId::Done
            } else {
                StepId::Cancelled
            }
        }
        StepId::Done | StepId::Cancelled => current,
    }
}

fn check_answer(step: &StepDescriptor, answer: &Answer) -> Result<(), FieldError> {
    let field = step.id.to_string();
    match (step.kind, answer) {
        (AnswerKind::Confirm { .. }, Answer::Bool(_)) => Ok(()),
        (AnswerKind::HostChoice, Answer::Choice(id)) => validate::required(&field, id),
        (AnswerKind::Text { optional, .. }, Answer::Text(text)) => match step.id {
            StepId::NetworkName => validate::network_name(&field, text),
            StepId::AddressRange => validate::ipv4_cidr(&field, text).map(|_| ()),
            StepId::EgressRanges => validate::cidr_list(&field, &split_list(text)).map(|_| ()),
            _ if !optional => validate::required(&field, text),
            _ => Ok(()),
        },
        _ => Err(FieldError {
            field,
            reason: "unexpected answer type".into(),
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ── State ────────────────────────────────────────────────────────────

/// Where the wizard is and what has been answered so far.
#[derive(Debug, Clone)]
pub struct SetupState {
    current: StepId,
    answers: IndexMap<StepId, Answer>,
}

impl Default for SetupState {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupState {
    pub fn new() -> Self {
        Self {
            current: StepId::NetworkName,
            answers: IndexMap::new(),
        }
    }

    pub fn current(&self) -> StepId {
        self.current
    }

    /// Descriptor for the current step, `None` once finished.
    pub fn step(&self) -> Option<&'static StepDescriptor> {
        descriptor(self.current)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.current, StepId::Done | StepId::Cancelled)
    }

    pub fn answers(&self) -> &IndexMap<StepId, Answer> {
        &self.answers
    }

    /// Record an answer for the current step and advance.
    ///
    /// A rejected answer leaves the state unchanged so the renderer can ask
    /// again.
    pub fn answer(&mut self, answer: Answer) -> Result<StepId, FieldError> {
        let Some(step) = self.step() else {
            return Err(FieldError {
                field: self.current.to_string(),
                reason: "setup already finished".into(),
            });
        };
        check_answer(step, &answer)?;

        let next = next_step(self.current, &answer);
        self.answers.insert(self.current, answer);
        self.current = next;
        Ok(next)
    }

    /// The command plan for the answers collected so far.
    pub fn plan(&self) -> Result<Vec<Command>, ValidationErrors> {
        compile_plan(&self.answers)
    }
}

// ── Plan ─────────────────────────────────────────────────────────────

/// Turn answers into the ordered commands that build the network.
///
/// Gateway roles address the host rather than a node id because the node
/// only exists once the host has joined.
pub fn compile_plan(answers: &IndexMap<StepId, Answer>) -> Result<Vec<Command>, ValidationErrors> {
    let text = |id: StepId| answers.get(&id).and_then(Answer::as_text).unwrap_or_default();
    let flag = |id: StepId| answers.get(&id).and_then(Answer::as_bool);

    let mut errors = ValidationErrors::new();
    let name = text(StepId::NetworkName).to_owned();
    errors.check(validate::network_name("network_name", &name));
    let range = match text(StepId::AddressRange) {
        "" => DEFAULT_ADDRESS_RANGE.to_owned(),
        other => other.to_owned(),
    };

    let mut plan = vec![Command::CreateNetwork(CreateNetworkRequest {
        name: name.clone(),
        ipv4_range: Some(range),
        ipv6_range: None,
        default_acl: DefaultAclPolicy::Allow,
        nameservers: Vec::new(),
        default_keepalive: None,
        default_mtu: None,
    })];

    if flag(StepId::UseGateway).unwrap_or(false) {
        let host = text(StepId::GatewayHost);
        if host.is_empty() {
            errors.push("gateway_host", "a gateway host is required");
        }
        let host_id = EntityId::from(host);

        plan.push(Command::AddHostToNetwork {
            host: host_id.clone(),
            network: name.clone(),
        });
        if flag(StepId::RemoteAccess).unwrap_or(false) {
            plan.push(Command::CreateIngress {
                network: name.clone(),
                node: NodeTarget::Host(host_id.clone()),
                request: CreateIngressRequest::default(),
            });
        }
        let ranges = split_list(text(StepId::EgressRanges));
        if !ranges.is_empty() {
            plan.push(Command::CreateEgress {
                network: name.clone(),
                node: NodeTarget::Host(host_id.clone()),
                request: CreateEgressRequest { ranges, nat: true },
            });
        }
        if flag(StepId::InternetGateway).unwrap_or(false) {
            plan.push(Command::CreateInternetGateway {
                network: name.clone(),
                node: NodeTarget::Host(host_id),
                clients: Vec::new(),
            });
        }
    }

    if flag(StepId::EnrollmentKey).unwrap_or(false) {
        plan.push(Command::CreateEnrollmentKey(CreateEnrollmentKeyRequest {
            networks: vec![name],
            unlimited: true,
            ..CreateEnrollmentKeyRequest::default()
        }));
    }

    for cmd in &plan {
        if let Err(e) = cmd.validate() {
            for field in e.errors() {
                errors.push(field.field.clone(), field.reason.clone());
            }
        }
    }
    errors.into_result().map(|()| plan)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn run(answers: Vec<Answer>) -> SetupState {
        let mut state = SetupState::new();
        for a in answers {
            state.answer(a).expect("answer accepted");
        }
        state
    }

    fn labels(plan: &[Command]) -> Vec<String> {
        plan.iter().map(Command::describe).collect()
    }

    #[test]
    fn declining_gateway_skips_to_enrollment_key() {
        assert_eq!(
            next_step(StepId::UseGateway, &Answer::Bool(false)),
            StepId::EnrollmentKey
        );
        assert_eq!(
            next_step(StepId::UseGateway, &Answer::Bool(true)),
            StepId::GatewayHost
        );
    }

    #[test]
    fn review_decides_done_or_cancelled() {
        assert_eq!(next_step(StepId::Review, &Answer::Bool(true)), StepId::Done);
        assert_eq!(
            next_step(StepId::Review, &Answer::Bool(false)),
            StepId::Cancelled
        );
        assert_eq!(next_step(StepId::Done, &Answer::Bool(true)), StepId::Done);
    }

    #[test]
    fn every_question_has_a_descriptor() {
        for id in [
            StepId::NetworkName,
            StepId::AddressRange,
            StepId::UseGateway,
            StepId::GatewayHost,
            StepId::RemoteAccess,
            StepId::EgressRanges,
            StepId::InternetGateway,
            StepId::EnrollmentKey,
            StepId::Review,
        ] {
            assert!(descriptor(id).is_some(), "{id}");
        }
        assert!(descriptor(StepId::Done).is_none());
    }

    #[test]
    fn invalid_answer_keeps_current_step() {
        let mut state = SetupState::new();
        let err = state.answer(Answer::Text("Bad Name!".into())).unwrap_err();
        assert_eq!(err.field, "network_name");
        assert_eq!(state.current(), StepId::NetworkName);

        let err = state.answer(Answer::Bool(true)).unwrap_err();
        assert_eq!(err.reason, "unexpected answer type");
    }

    #[test]
    fn full_gateway_plan_runs_in_order() {
        let state = run(vec![
            Answer::Text("office".into()),
            Answer::Text("10.20.0.0/16".into()),
            Answer::Bool(true),
            Answer::Choice("gw-host".into()),
            Answer::Bool(true),
            Answer::Text("192.168.1.0/24, 192.168.1.0/24".into()),
            Answer::Bool(true),
            Answer::Bool(true),
            Answer::Bool(true),
        ]);
        assert!(state.is_finished());
        assert_eq!(state.current(), StepId::Done);

        let plan = state.plan().expect("valid plan");
        assert_eq!(
            labels(&plan),
            vec![
                "create network office",
                "add host gw-host to network office",
                "make host gw-host a remote-access gateway in office",
                "make host gw-host an egress gateway in office",
                "make host gw-host an internet gateway in office",
                "create enrollment key for office",
            ]
        );
        let Some(Command::CreateNetwork(req)) = plan.first() else {
            panic!("first step creates the network");
        };
        assert_eq!(req.ipv4_range.as_deref(), Some("10.20.0.0/16"));
    }

    #[test]
    fn no_gateway_plan_only_creates_network_and_key() {
        let state = run(vec![
            Answer::Text("lab".into()),
            Answer::Text(DEFAULT_ADDRESS_RANGE.into()),
            Answer::Bool(false),
            Answer::Bool(true),
            Answer::Bool(true),
        ]);
        let plan = state.plan().expect("valid plan");
        assert_eq!(
            labels(&plan),
            vec!["create network lab", "create enrollment key for lab"]
        );
    }

    #[test]
    fn blank_egress_ranges_add_no_egress_step() {
        let state = run(vec![
            Answer::Text("lab".into()),
            Answer::Text(DEFAULT_ADDRESS_RANGE.into()),
            Answer::Bool(true),
            Answer::Choice("h1".into()),
            Answer::Bool(false),
            Answer::Text("  ".into()),
            Answer::Bool(false),
            Answer::Bool(false),
        ]);
        let plan = state.plan().expect("valid plan");
        assert_eq!(
            labels(&plan),
            vec!["create network lab", "add host h1 to network lab"]
        );
    }

    #[test]
    fn plan_without_name_is_rejected() {
        let answers = IndexMap::new();
        let err = compile_plan(&answers).unwrap_err();
        assert!(err.errors().iter().any(|e| e.field == "network_name"));
    }
}
