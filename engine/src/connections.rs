use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{EngineError, EngineResult},
    registry::GateRegistry,
    types::{ConnectionId, GateId, PortEnd},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: GateId,
    pub destination: GateId,
}

/// Directed edges between gates, keyed by id. Ids only grow, so iterating the
/// map yields edges in insertion order, which is also the positional order of
/// a destination's inputs.
#[derive(Debug, Default, Clone)]
pub struct ConnectionSet {
    edges: BTreeMap<ConnectionId, Connection>,
    last_id: u32,
}

impl ConnectionSet {
    pub fn new() -> ConnectionSet {
        ConnectionSet::default()
    }

    pub fn connect(
        &mut self,
        gates: &GateRegistry,
        source: GateId,
        destination: GateId,
    ) -> EngineResult<ConnectionId> {
        validate_edge(gates, source, destination)?;
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or(EngineError::IdSpaceExhausted { kind: "connection" })?;
        let id = ConnectionId(self.last_id);
        self.edges.insert(
            id,
            Connection {
                id,
                source,
                destination,
            },
        );
        debug!("connected {} -> {} as {}", source, destination, id);
        Ok(id)
    }

    pub(crate) fn restore(&mut self, gates: &GateRegistry, conn: Connection) -> EngineResult<()> {
        if self.edges.contains_key(&conn.id) {
            return Err(EngineError::Snapshot {
                detail: format!("connection id {} appears twice", conn.id),
            });
        }
        validate_edge(gates, conn.source, conn.destination)?;
        self.last_id = self.last_id.max(conn.id.0);
        self.edges.insert(conn.id, conn);
        Ok(())
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> EngineResult<Connection> {
        let conn = self
            .edges
            .remove(&id)
            .ok_or(EngineError::UnknownConnection { id })?;
        debug!("disconnected {}", id);
        Ok(conn)
    }

    pub fn get(&self, id: ConnectionId) -> EngineResult<&Connection> {
        self.edges
            .get(&id)
            .ok_or(EngineError::UnknownConnection { id })
    }

    /// Sources feeding `destination`, in the order the edges were made.
    pub fn connections_into(&self, destination: GateId) -> Vec<GateId> {
        self.edges
            .values()
            .filter(|c| c.destination == destination)
            .map(|c| c.source)
            .collect()
    }

    pub fn connections_from(&self, source: GateId) -> Vec<GateId> {
        self.edges
            .values()
            .filter(|c| c.source == source)
            .map(|c| c.destination)
            .collect()
    }

    /// Ids of every edge with `gate` at either end.
    pub fn touching(&self, gate: GateId) -> Vec<ConnectionId> {
        self.edges
            .values()
            .filter(|c| c.source == gate || c.destination == gate)
            .map(|c| c.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.edges.values()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}

fn validate_edge(gates: &GateRegistry, source: GateId, destination: GateId) -> EngineResult<()> {
    let src_kind = gates.kind(source)?;
    let dst_kind = gates.kind(destination)?;
    if source == destination {
        return Err(EngineError::SelfLoop { id: source });
    }
    if !src_kind.has_output_port() {
        return Err(EngineError::InvalidPort {
            id: source,
            kind: src_kind,
            end: PortEnd::Source,
        });
    }
    if !dst_kind.has_input_port() {
        return Err(EngineError::InvalidPort {
            id: destination,
            kind: dst_kind,
            end: PortEnd::Destination,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GateKind;

    #[test]
    fn inputs_are_listed_in_insertion_order() {
        let mut g = GateRegistry::new();
        let a = g.create(GateKind::Input, None).unwrap();
        let b = g.create(GateKind::Input, None).unwrap();
        let and = g.create(GateKind::And, None).unwrap();
        let mut set = ConnectionSet::new();
        set.connect(&g, b, and).unwrap();
        set.connect(&g, a, and).unwrap();
        assert_eq!(set.connections_into(and), vec![b, a]);
        assert_eq!(set.connections_from(a), vec![and]);
    }

    #[test]
    fn rejects_bad_edges() {
        let mut g = GateRegistry::new();
        let i = g.create(GateKind::Input, None).unwrap();
        let o = g.create(GateKind::Output, None).unwrap();
        let n = g.create(GateKind::Not, None).unwrap();
        let mut set = ConnectionSet::new();

        assert!(matches!(
            set.connect(&g, i, GateId(42)),
            Err(EngineError::UnknownGate { id: GateId(42) })
        ));
        assert!(matches!(
            set.connect(&g, n, n),
            Err(EngineError::SelfLoop { .. })
        ));
        assert!(matches!(
            set.connect(&g, o, n),
            Err(EngineError::InvalidPort { end: PortEnd::Source, .. })
        ));
        assert!(matches!(
            set.connect(&g, n, i),
            Err(EngineError::InvalidPort { end: PortEnd::Destination, .. })
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn disconnect_unknown_fails() {
        let mut set = ConnectionSet::new();
        assert!(matches!(
            set.disconnect(ConnectionId(1)),
            Err(EngineError::UnknownConnection { .. })
        ));
    }
    #[test]
    fn exhausted_counter_refuses_new_connections() {
        let mut g = GateRegistry::new();
        let i = g.create(GateKind::Input, None).unwrap();
        let a = g.create(GateKind::And, None).unwrap();
        let mut set = ConnectionSet::new();
        let last = Connection {
            id: ConnectionId(u32::MAX),
            source: i,
            destination: a,
        };
        set.restore(&g, last).unwrap();
        assert!(matches!(
            set.connect(&g, i, a),
            Err(EngineError::IdSpaceExhausted { kind: "connection" })
        ));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(ConnectionId(u32::MAX)).unwrap(), &last);
    }
}
