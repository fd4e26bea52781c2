use std::{
    borrow::Cow,
    collections::HashSet,
    sync::atomic::{AtomicBool, Ordering},
};

use log::{debug, warn};

use crate::{
    components::Gate,
    config::TruthTableConfig,
    connections::{Connection, ConnectionSet},
    errors::{EngineError, EngineResult},
    evaluator,
    registry::GateRegistry,
    resolver::{resolve, EvalPlan},
    snapshot::{self, CircuitSnapshot},
    table::{self, Layout, TruthTable},
    types::{ConnectionId, GateId, GateKind},
    utils::form_expr,
};

/// Longest expression `Circuit::expression` will build, in bytes. Shared
/// sub-circuits are written out again at every use, so reconvergent fan-out
/// doubles the text per level.
pub const MAX_EXPRESSION_LEN: usize = 1 << 16;

/// A combinational circuit: gates, the wires between them and a cached
/// evaluation plan that any structural change throws away.
#[derive(Debug, Default, Clone)]
pub struct Circuit {
    gates: GateRegistry,
    connections: ConnectionSet,
    plan: Option<EvalPlan>,
}

impl Circuit {
    pub fn new() -> Circuit {
        Circuit::default()
    }

    pub fn create_gate(&mut self, kind: GateKind) -> EngineResult<GateId> {
        self.invalidate();
        self.gates.create(kind, None)
    }

    pub fn create_labeled_gate(&mut self, kind: GateKind, label: &str) -> EngineResult<GateId> {
        self.invalidate();
        self.gates.create(kind, Some(label.to_string()))
    }

    /// Creates a gate from its kind name, e.g. `"NAND"`.
    pub fn add_component(&mut self, typ: &str, label: &str) -> EngineResult<GateId> {
        let kind: GateKind = typ.parse()?;
        let label = (!label.is_empty()).then(|| label.to_string());
        self.invalidate();
        self.gates.create(kind, label)
    }

    pub fn add_input(&mut self, label: &str, init_val: bool) -> EngineResult<GateId> {
        let id = self.create_labeled_gate(GateKind::Input, label)?;
        self.gates.set_input_value(id, init_val)?;
        Ok(id)
    }

    /// Fails with `GateInUse` while any connection still touches the gate.
    pub fn remove_gate(&mut self, id: GateId) -> EngineResult<()> {
        self.gates.get(id)?;
        let touching = self.connections.touching(id);
        if !touching.is_empty() {
            return Err(EngineError::GateInUse {
                id,
                connections: touching,
            });
        }
        self.invalidate();
        self.gates.remove(id)?;
        Ok(())
    }

    /// Removes the gate along with every connection at either end of it.
    pub fn remove_gate_with_connections(&mut self, id: GateId) -> EngineResult<Vec<Connection>> {
        self.gates.get(id)?;
        self.invalidate();
        let mut removed = Vec::new();
        for cid in self.connections.touching(id) {
            removed.push(self.connections.disconnect(cid)?);
        }
        self.gates.remove(id)?;
        Ok(removed)
    }

    pub fn connect(&mut self, source: GateId, destination: GateId) -> EngineResult<ConnectionId> {
        let id = self.connections.connect(&self.gates, source, destination)?;
        self.invalidate();
        Ok(id)
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> EngineResult<Connection> {
        let conn = self.connections.disconnect(id)?;
        self.invalidate();
        Ok(conn)
    }

    pub fn connections_into(&self, destination: GateId) -> EngineResult<Vec<GateId>> {
        self.gates.get(destination)?;
        Ok(self.connections.connections_into(destination))
    }

    pub fn connections_from(&self, source: GateId) -> EngineResult<Vec<GateId>> {
        self.gates.get(source)?;
        Ok(self.connections.connections_from(source))
    }

    pub fn set_input_value(&mut self, id: GateId, value: bool) -> EngineResult<()> {
        self.gates.set_input_value(id, value)
    }

    pub fn value(&self, id: GateId) -> EngineResult<bool> {
        self.gates.value(id)
    }

    pub fn gate(&self, id: GateId) -> EngineResult<&Gate> {
        self.gates.get(id)
    }

    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.gates.iter()
    }

    pub fn inputs(&self) -> Vec<GateId> {
        self.gates.ids_of_kind(GateKind::Input)
    }

    pub fn outputs(&self) -> Vec<GateId> {
        self.gates.ids_of_kind(GateKind::Output)
    }

    pub fn connection(&self, id: ConnectionId) -> EngineResult<&Connection> {
        self.connections.get(id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Empties the circuit. Ids handed out before stay retired.
    pub fn clear(&mut self) {
        self.gates.clear();
        self.connections.clear();
        self.invalidate();
        debug!("circuit cleared");
    }

    pub fn evaluation_order(&mut self) -> EngineResult<Vec<GateId>> {
        let Circuit {
            gates,
            connections,
            plan,
        } = self;
        Ok(cached_plan(plan, gates, connections)?.order().to_vec())
    }

    /// Runs one simulation pass. On error no gate value changes.
    pub fn evaluate(&mut self) -> EngineResult<()> {
        let Circuit {
            gates,
            connections,
            plan,
        } = self;
        let plan = cached_plan(plan, gates, connections)?;
        evaluator::evaluate(plan, gates)
    }

    /// Tabulates `outputs` over every assignment of `inputs`. Gate values are
    /// left as they were for the last row; see `input_values` and
    /// `restore_inputs` to put a baseline back.
    pub fn enumerate_truth_table(
        &mut self,
        inputs: &[GateId],
        outputs: &[GateId],
        config: &TruthTableConfig,
    ) -> EngineResult<TruthTable> {
        self.enumerate_truth_table_until(inputs, outputs, config, |_| false)
    }

    /// Like `enumerate_truth_table`, checking `cancel` before every row.
    pub fn enumerate_truth_table_cancellable(
        &mut self,
        inputs: &[GateId],
        outputs: &[GateId],
        config: &TruthTableConfig,
        cancel: &AtomicBool,
    ) -> EngineResult<TruthTable> {
        self.enumerate_truth_table_until(inputs, outputs, config, |_| {
            cancel.load(Ordering::Relaxed)
        })
    }

    /// Asks `stop` with each row index before evaluating that row. A stopped
    /// table holds the rows before it and gate values are those of its last
    /// row; stopping at row 0 leaves every value untouched.
    pub fn enumerate_truth_table_until(
        &mut self,
        inputs: &[GateId],
        outputs: &[GateId],
        config: &TruthTableConfig,
        stop: impl FnMut(usize) -> bool,
    ) -> EngineResult<TruthTable> {
        self.check_table_size(inputs, outputs, config)?;
        let Circuit {
            gates,
            connections,
            plan,
        } = self;
        let plan = cached_plan(plan, gates, connections)?;
        let layout = layout_for(gates, plan, inputs, outputs)?;
        let mut values = evaluator::load_values(plan, gates);
        let table = table::enumerate(plan, layout, &mut values, stop);
        if !table.is_empty() {
            evaluator::commit_values(plan, &values, gates)?;
        }
        debug!(
            "truth table: {} rows over {} inputs, complete={}",
            table.len(),
            inputs.len(),
            table.is_complete()
        );
        Ok(table)
    }

    /// Evaluates rows on the rayon pool, each worker on its own copy of the
    /// gate values. Needs only shared access and writes nothing back.
    pub fn enumerate_truth_table_parallel(
        &self,
        inputs: &[GateId],
        outputs: &[GateId],
        config: &TruthTableConfig,
    ) -> EngineResult<TruthTable> {
        self.check_table_size(inputs, outputs, config)?;
        let plan = match &self.plan {
            Some(p) => Cow::Borrowed(p),
            None => Cow::Owned(resolve(&self.gates, &self.connections)?),
        };
        let layout = self.layout(&plan, inputs, outputs)?;
        let base = evaluator::load_values(&plan, &self.gates);
        Ok(table::enumerate_parallel(&plan, layout, &base))
    }

    /// Every input and output in creation order, default limits.
    pub fn truth_table(&mut self) -> EngineResult<TruthTable> {
        let inputs = self.inputs();
        let outputs = self.outputs();
        self.enumerate_truth_table(&inputs, &outputs, &TruthTableConfig::default())
    }

    fn check_table_size(
        &self,
        inputs: &[GateId],
        outputs: &[GateId],
        config: &TruthTableConfig,
    ) -> EngineResult<()> {
        check_ids(&self.gates, inputs, GateKind::Input)?;
        check_ids(&self.gates, outputs, GateKind::Output)?;
        if config.check(inputs.len())? {
            warn!(
                "truth table over {} inputs has {} rows",
                inputs.len(),
                1u128 << inputs.len().min(127)
            );
        }
        let ceiling = usize::BITS as usize - 1;
        if inputs.len() > ceiling {
            return Err(EngineError::InputLimitExceeded {
                inputs: inputs.len(),
                limit: ceiling,
            });
        }
        Ok(())
    }

    fn layout(&self, plan: &EvalPlan, inputs: &[GateId], outputs: &[GateId]) -> EngineResult<Layout> {
        layout_for(&self.gates, plan, inputs, outputs)
    }

    /// Current value of every input, for handing back to `restore_inputs`.
    pub fn input_values(&self) -> Vec<(GateId, bool)> {
        self.gates
            .iter()
            .filter(|g| g.kind == GateKind::Input)
            .map(|g| (g.id, g.value))
            .collect()
    }

    /// Sets several inputs at once; nothing changes unless all are inputs.
    pub fn restore_inputs(&mut self, values: &[(GateId, bool)]) -> EngineResult<()> {
        for (id, _) in values {
            let kind = self.gates.kind(*id)?;
            if kind != GateKind::Input {
                return Err(EngineError::NotAnInput { id: *id, kind });
            }
        }
        for (id, v) in values {
            self.gates.set_input_value(*id, *v)?;
        }
        Ok(())
    }

    /// Boolean expression computed by a gate, in terms of the inputs. Only
    /// the gate's fan-in cone is expanded. Fails with `ExpressionTooLong` once
    /// any gate in that cone would pass `MAX_EXPRESSION_LEN`.
    pub fn expression(&mut self, id: GateId) -> EngineResult<String> {
        self.gates.get(id)?;
        let Circuit {
            gates,
            connections,
            plan,
        } = self;
        let plan = cached_plan(plan, gates, connections)?;
        let target = plan.slot(id).ok_or(EngineError::UnknownGate { id })?;

        // sources always sit in lower slots, so one backward sweep finds the cone
        let mut needed = vec![false; target + 1];
        needed[target] = true;
        for slot in (0..=target).rev() {
            if needed[slot] {
                for s in &plan.steps[slot].sources {
                    needed[*s] = true;
                }
            }
        }

        let mut exprs: Vec<String> = vec![String::new(); target + 1];
        for (slot, step) in plan.steps[..=target].iter().enumerate() {
            if !needed[slot] {
                continue;
            }
            let e = if step.kind == GateKind::Input {
                gates.get(step.id)?.display_name()
            } else {
                let ins: Vec<String> = step.sources.iter().map(|s| exprs[*s].clone()).collect();
                form_expr(&ins, step.kind)
            };
            if e.len() > MAX_EXPRESSION_LEN {
                return Err(EngineError::ExpressionTooLong {
                    id: step.id,
                    limit: MAX_EXPRESSION_LEN,
                });
            }
            exprs[slot] = e;
        }
        Ok(exprs.swap_remove(target))
    }

    pub fn to_snapshot(&self) -> CircuitSnapshot {
        snapshot::capture(&self.gates, &self.connections)
    }

    pub fn from_snapshot(snap: &CircuitSnapshot) -> EngineResult<Circuit> {
        let (gates, connections) = snapshot::rebuild(snap)?;
        debug!(
            "loaded circuit with {} gates and {} connections",
            gates.len(),
            connections.len()
        );
        Ok(Circuit {
            gates,
            connections,
            plan: None,
        })
    }

    pub fn to_json(&self) -> EngineResult<String> {
        self.to_snapshot().to_json()
    }

    pub fn from_json(text: &str) -> EngineResult<Circuit> {
        Circuit::from_snapshot(&CircuitSnapshot::from_json(text)?)
    }

    fn invalidate(&mut self) {
        self.plan = None;
    }
}

fn cached_plan<'a>(
    slot: &'a mut Option<EvalPlan>,
    gates: &GateRegistry,
    connections: &ConnectionSet,
) -> EngineResult<&'a EvalPlan> {
    let plan = match slot.take() {
        Some(p) => p,
        None => resolve(gates, connections)?,
    };
    Ok(slot.insert(plan))
}

fn check_ids(gates: &GateRegistry, ids: &[GateId], want: GateKind) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        let kind = gates.kind(*id)?;
        if kind != want {
            return Err(match want {
                GateKind::Input => EngineError::NotAnInput { id: *id, kind },
                _ => EngineError::NotAnOutput { id: *id, kind },
            });
        }
        if !seen.insert(*id) {
            return Err(EngineError::DuplicateGate { id: *id });
        }
    }
    Ok(())
}

fn layout_for(
    gates: &GateRegistry,
    plan: &EvalPlan,
    inputs: &[GateId],
    outputs: &[GateId],
) -> EngineResult<Layout> {
    let slot = |id: &GateId| plan.slot(*id).ok_or(EngineError::UnknownGate { id: *id });
    let name = |id: &GateId, prefix: &str, pos: usize| -> EngineResult<String> {
        Ok(match gates.get(*id)?.label.as_deref() {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => format!("{}{}", prefix, pos + 1),
        })
    };

    let mut columns = Vec::with_capacity(inputs.len() + outputs.len());
    for (i, id) in inputs.iter().enumerate() {
        columns.push(name(id, "IN", i)?);
    }
    for (i, id) in outputs.iter().enumerate() {
        columns.push(name(id, "OUT", i)?);
    }
    Ok(Layout {
        columns,
        input_slots: inputs.iter().map(slot).collect::<EngineResult<Vec<usize>>>()?,
        output_slots: outputs.iter().map(slot).collect::<EngineResult<Vec<usize>>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn and_demo() -> (Circuit, GateId, GateId, GateId) {
        let mut c = Circuit::new();
        let a = c.create_gate(GateKind::Input).unwrap();
        let b = c.create_gate(GateKind::Input).unwrap();
        let and = c.create_gate(GateKind::And).unwrap();
        let out = c.create_gate(GateKind::Output).unwrap();
        c.connect(a, and).unwrap();
        c.connect(b, and).unwrap();
        c.connect(and, out).unwrap();
        (c, a, b, out)
    }

    #[test]
    fn plan_is_cached_until_structure_changes() {
        let (mut c, a, _, out) = and_demo();
        c.evaluate().unwrap();
        assert!(c.plan.is_some());
        c.set_input_value(a, true).unwrap();
        assert!(c.plan.is_some());
        let n = c.create_gate(GateKind::Not).unwrap();
        assert!(c.plan.is_none());
        c.connect(out, n).unwrap_err();
        c.remove_gate(n).unwrap();
        c.evaluate().unwrap();
        assert!(c.plan.is_some());
    }

    #[test]
    fn failed_evaluation_writes_nothing() {
        let (mut c, a, b, out) = and_demo();
        c.set_input_value(a, true).unwrap();
        c.set_input_value(b, true).unwrap();
        c.evaluate().unwrap();
        assert!(c.value(out).unwrap());

        c.set_input_value(b, false).unwrap();
        let dangling = c.create_gate(GateKind::Or).unwrap();
        assert!(matches!(
            c.evaluate(),
            Err(EngineError::MissingInput { id, .. }) if id == dangling
        ));
        assert!(c.value(out).unwrap());
    }

    #[test]
    fn expressions_follow_labels() {
        let mut c = Circuit::new();
        let a = c.add_input("A", false).unwrap();
        let b = c.add_input("B", false).unwrap();
        let x = c.add_component("xor", "").unwrap();
        let n = c.add_component("NOT", "").unwrap();
        let o = c.add_component("OUT", "F").unwrap();
        c.connect(a, x).unwrap();
        c.connect(b, x).unwrap();
        c.connect(x, n).unwrap();
        c.connect(n, o).unwrap();
        assert_eq!(c.expression(o).unwrap(), "!(A^B)");
        assert_eq!(c.expression(a).unwrap(), "A");
    }

    #[test]
    fn reconvergent_expressions_are_capped() {
        let mut c = Circuit::new();
        let a = c.add_input("A", false).unwrap();
        let mut prev = a;
        let mut chain = Vec::new();
        for _ in 0..24 {
            let x = c.create_gate(GateKind::Xor).unwrap();
            c.connect(prev, x).unwrap();
            c.connect(prev, x).unwrap();
            chain.push(x);
            prev = x;
        }
        let out = c.create_labeled_gate(GateKind::Output, "F").unwrap();
        c.connect(prev, out).unwrap();

        assert_eq!(c.expression(chain[1]).unwrap(), "((A^A)^(A^A))");
        let err = c.expression(out).unwrap_err();
        assert_eq!(err.code(), "expression_too_long");
        match err {
            EngineError::ExpressionTooLong { id, limit } => {
                assert_eq!(limit, MAX_EXPRESSION_LEN);
                assert!(chain.contains(&id));
            }
            other => panic!("expected a length error, got {:?}", other),
        }
        // the blown-up chain lies downstream, so a short one is unaffected
        let b = c.add_input("B", true).unwrap();
        let n = c.create_gate(GateKind::Not).unwrap();
        c.connect(b, n).unwrap();
        assert_eq!(c.expression(n).unwrap(), "!B");
        c.evaluate().unwrap();
        assert!(!c.value(out).unwrap());
    }

    #[test]
    fn restore_inputs_is_all_or_nothing() {
        let (mut c, a, _, out) = and_demo();
        let err = c.restore_inputs(&[(a, true), (out, true)]).unwrap_err();
        assert!(matches!(err, EngineError::NotAnInput { .. }));
        assert!(!c.value(a).unwrap());
    }

    #[test]
    fn table_orderings_are_validated() {
        let (mut c, a, b, out) = and_demo();
        let cfg = TruthTableConfig::default();
        assert!(matches!(
            c.enumerate_truth_table(&[a, a], &[out], &cfg),
            Err(EngineError::DuplicateGate { .. })
        ));
        assert!(matches!(
            c.enumerate_truth_table(&[a, out], &[out], &cfg),
            Err(EngineError::NotAnInput { .. })
        ));
        assert!(matches!(
            c.enumerate_truth_table(&[a, b], &[a], &cfg),
            Err(EngineError::NotAnOutput { .. })
        ));
        assert!(matches!(
            c.enumerate_truth_table(&[a, b], &[out], &TruthTableConfig::with_hard_limit(1)),
            Err(EngineError::InputLimitExceeded { inputs: 2, limit: 1 })
        ));
    }
}
