use serde::{Deserialize, Serialize};

use crate::{
    components::Gate,
    connections::{Connection, ConnectionSet},
    errors::{EngineError, EngineResult},
    registry::GateRegistry,
    types::{GateId, GateKind},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRecord {
    pub id: GateId,
    pub kind: GateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Only inputs carry a value; everything else is recomputed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

/// Minimal persisted form of a circuit: gates and connections, each in
/// creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub gates: Vec<GateRecord>,
    pub connections: Vec<Connection>,
}

impl CircuitSnapshot {
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> EngineResult<CircuitSnapshot> {
        Ok(serde_json::from_str(text)?)
    }
}

pub(crate) fn capture(gates: &GateRegistry, connections: &ConnectionSet) -> CircuitSnapshot {
    CircuitSnapshot {
        gates: gates
            .iter()
            .map(|g| GateRecord {
                id: g.id,
                kind: g.kind,
                label: g.label.clone(),
                value: (g.kind == GateKind::Input).then_some(g.value),
            })
            .collect(),
        connections: connections.iter().copied().collect(),
    }
}

pub(crate) fn rebuild(snap: &CircuitSnapshot) -> EngineResult<(GateRegistry, ConnectionSet)> {
    let mut records: Vec<&GateRecord> = snap.gates.iter().collect();
    records.sort_by_key(|r| r.id);
    let mut gates = GateRegistry::new();
    for r in records {
        if r.value.is_some() && r.kind != GateKind::Input {
            return Err(EngineError::Snapshot {
                detail: format!("{} gate {} carries a value", r.kind, r.id),
            });
        }
        let mut gate = Gate::new(r.id, r.kind, r.label.clone());
        gate.value = r.value.unwrap_or(false);
        gates.restore(gate)?;
    }

    let mut conns: Vec<Connection> = snap.connections.clone();
    conns.sort_by_key(|c| c.id);
    let mut connections = ConnectionSet::new();
    for c in conns {
        connections.restore(&gates, c)?;
    }
    Ok((gates, connections))
}
