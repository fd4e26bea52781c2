use std::collections::BTreeMap;

use log::debug;

use crate::{
    components::Gate,
    errors::{EngineError, EngineResult},
    types::{GateId, GateKind},
};

/// Owns every gate. Iteration is in creation order since ids only grow.
#[derive(Debug, Default, Clone)]
pub struct GateRegistry {
    gates: BTreeMap<GateId, Gate>,
    last_id: u32,
}

impl GateRegistry {
    pub fn new() -> GateRegistry {
        GateRegistry::default()
    }

    pub fn create(&mut self, kind: GateKind, label: Option<String>) -> EngineResult<GateId> {
        let id = self.new_id()?;
        self.gates.insert(id, Gate::new(id, kind, label));
        debug!("created {} gate {}", kind, id);
        Ok(id)
    }

    /// Re-inserts a gate under a known id. Later ids continue after it.
    pub(crate) fn restore(&mut self, gate: Gate) -> EngineResult<()> {
        if self.gates.contains_key(&gate.id) {
            return Err(EngineError::Snapshot {
                detail: format!("gate id {} appears twice", gate.id),
            });
        }
        self.last_id = self.last_id.max(gate.id.0);
        self.gates.insert(gate.id, gate);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: GateId) -> EngineResult<Gate> {
        let gate = self
            .gates
            .remove(&id)
            .ok_or(EngineError::UnknownGate { id })?;
        debug!("removed {} gate {}", gate.kind, id);
        Ok(gate)
    }

    pub fn get(&self, id: GateId) -> EngineResult<&Gate> {
        self.gates.get(&id).ok_or(EngineError::UnknownGate { id })
    }

    pub fn contains(&self, id: GateId) -> bool {
        self.gates.contains_key(&id)
    }

    pub fn kind(&self, id: GateId) -> EngineResult<GateKind> {
        self.get(id).map(|g| g.kind)
    }

    pub fn value(&self, id: GateId) -> EngineResult<bool> {
        self.get(id).map(|g| g.value)
    }

    pub fn set_input_value(&mut self, id: GateId, value: bool) -> EngineResult<()> {
        let gate = self
            .gates
            .get_mut(&id)
            .ok_or(EngineError::UnknownGate { id })?;
        if gate.kind != GateKind::Input {
            return Err(EngineError::NotAnInput {
                id,
                kind: gate.kind,
            });
        }
        gate.value = value;
        Ok(())
    }

    /// Written only by the evaluator, with ids taken from a resolved plan.
    pub(crate) fn write_value(&mut self, id: GateId, value: bool) -> EngineResult<()> {
        let gate = self
            .gates
            .get_mut(&id)
            .ok_or(EngineError::UnknownGate { id })?;
        gate.value = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gate> {
        self.gates.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = GateId> + '_ {
        self.gates.keys().copied()
    }

    pub fn ids_of_kind(&self, kind: GateKind) -> Vec<GateId> {
        self.gates
            .values()
            .filter(|g| g.kind == kind)
            .map(|g| g.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Drops every gate. The id counter keeps going so old ids stay dead.
    pub fn clear(&mut self) {
        self.gates.clear();
    }

    fn new_id(&mut self) -> EngineResult<GateId> {
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or(EngineError::IdSpaceExhausted { kind: "gate" })?;
        Ok(GateId(self.last_id))
    }
}
