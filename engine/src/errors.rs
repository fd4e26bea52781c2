use thiserror::Error;

use crate::types::{ConnectionId, GateId, GateKind, PortEnd};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no gate with id {id}")]
    UnknownGate { id: GateId },
    #[error("no connection with id {id}")]
    UnknownConnection { id: ConnectionId },
    #[error("`{name}` is not a gate kind")]
    InvalidKind { name: String },
    #[error("{kind} gate {id} has no {} port", port_name(.end))]
    InvalidPort {
        id: GateId,
        kind: GateKind,
        end: PortEnd,
    },
    #[error("gate {id} can't be connected to itself")]
    SelfLoop { id: GateId },
    #[error("gate {id} is still referenced by {} connection(s)", .connections.len())]
    GateInUse {
        id: GateId,
        connections: Vec<ConnectionId>,
    },
    #[error("gate {id} is a {kind} gate, not an INPUT")]
    NotAnInput { id: GateId, kind: GateKind },
    #[error("gate {id} is a {kind} gate, not an OUTPUT")]
    NotAnOutput { id: GateId, kind: GateKind },
    #[error("gate {id} is listed more than once")]
    DuplicateGate { id: GateId },
    #[error("circuit has a cycle through gates {}", join_ids(.gates))]
    CycleDetected { gates: Vec<GateId> },
    #[error("{kind} gate {id} has no incoming connection")]
    MissingInput { id: GateId, kind: GateKind },
    #[error("{kind} gate {id} takes {expected} input(s), found {found}")]
    TooManyInputs {
        id: GateId,
        kind: GateKind,
        expected: usize,
        found: usize,
    },
    #[error("truth table over {inputs} inputs exceeds the limit of {limit}")]
    InputLimitExceeded { inputs: usize, limit: usize },
    #[error("expression for gate {id} is longer than {limit} bytes")]
    ExpressionTooLong { id: GateId, limit: usize },
    #[error("no {kind} ids left to hand out")]
    IdSpaceExhausted { kind: &'static str },
    #[error("invalid snapshot: {detail}")]
    Snapshot { detail: String },
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownGate { .. } => "unknown_gate",
            Self::UnknownConnection { .. } => "unknown_connection",
            Self::InvalidKind { .. } => "invalid_kind",
            Self::InvalidPort { .. } => "invalid_port",
            Self::SelfLoop { .. } => "self_loop",
            Self::GateInUse { .. } => "gate_in_use",
            Self::NotAnInput { .. } => "not_an_input",
            Self::NotAnOutput { .. } => "not_an_output",
            Self::DuplicateGate { .. } => "duplicate_gate",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::MissingInput { .. } => "missing_input",
            Self::TooManyInputs { .. } => "too_many_inputs",
            Self::InputLimitExceeded { .. } => "input_limit_exceeded",
            Self::ExpressionTooLong { .. } => "expression_too_long",
            Self::IdSpaceExhausted { .. } => "id_space_exhausted",
            Self::Snapshot { .. } => "invalid_snapshot",
            Self::Serialization(_) => "serialization",
        }
    }
}

fn port_name(end: &PortEnd) -> &'static str {
    match end {
        PortEnd::Source => "outgoing",
        PortEnd::Destination => "incoming",
    }
}

fn join_ids(ids: &[GateId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
