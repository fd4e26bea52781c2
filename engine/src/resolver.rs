use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::{
    connections::ConnectionSet,
    errors::{EngineError, EngineResult},
    registry::GateRegistry,
    types::{Arity, GateId, GateKind},
};

/// One gate's work in a compiled plan. `sources` index into the plan's value
/// buffer, in the destination's positional input order.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub id: GateId,
    pub kind: GateKind,
    pub sources: Vec<usize>,
}

/// A validated, topologically ordered evaluation schedule. Slot `i` of a value
/// buffer belongs to `order[i]`, so every step only reads slots below its own.
#[derive(Debug, Clone)]
pub struct EvalPlan {
    order: Vec<GateId>,
    slots: HashMap<GateId, usize>,
    pub(crate) steps: Vec<Step>,
}

impl EvalPlan {
    pub fn order(&self) -> &[GateId] {
        &self.order
    }

    pub fn slot(&self, id: GateId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Orders the graph with Kahn's algorithm. Among ready gates the oldest goes
/// first. Arity is checked once the order is known.
pub fn resolve(gates: &GateRegistry, edges: &ConnectionSet) -> EngineResult<EvalPlan> {
    let mut inputs: HashMap<GateId, Vec<GateId>> = HashMap::new();
    let mut succs: HashMap<GateId, Vec<GateId>> = HashMap::new();
    let mut in_degree: BTreeMap<GateId, usize> = gates.ids().map(|id| (id, 0)).collect();

    for conn in edges.iter() {
        inputs.entry(conn.destination).or_default().push(conn.source);
        succs.entry(conn.source).or_default().push(conn.destination);
        *in_degree.entry(conn.destination).or_default() += 1;
    }

    let mut ready: BTreeSet<GateId> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(id) = ready.pop_first() {
        order.push(id);
        for next in succs.get(&id).into_iter().flatten() {
            if let Some(d) = in_degree.get_mut(next) {
                *d -= 1;
                if *d == 0 {
                    ready.insert(*next);
                }
            }
        }
    }

    if order.len() < in_degree.len() {
        let placed: BTreeSet<GateId> = order.iter().copied().collect();
        let stuck: BTreeSet<GateId> = in_degree
            .keys()
            .filter(|id| !placed.contains(id))
            .copied()
            .collect();
        let gates = cycle_members(&stuck, &succs);
        debug!("cycle through {:?}", gates);
        return Err(EngineError::CycleDetected { gates });
    }

    let slots: HashMap<GateId, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let mut steps = Vec::with_capacity(order.len());
    for id in &order {
        let kind = gates.kind(*id)?;
        let srcs = inputs.remove(id).unwrap_or_default();
        check_arity(*id, kind, srcs.len())?;
        steps.push(Step {
            id: *id,
            kind,
            sources: srcs.iter().filter_map(|s| slots.get(s).copied()).collect(),
        });
    }
    debug!("resolved evaluation order over {} gates", order.len());

    Ok(EvalPlan {
        order,
        slots,
        steps,
    })
}

fn check_arity(id: GateId, kind: GateKind, found: usize) -> EngineResult<()> {
    match kind.arity() {
        Arity::None if found > 0 => Err(EngineError::TooManyInputs {
            id,
            kind,
            expected: 0,
            found,
        }),
        Arity::Exactly(n) | Arity::AtLeast(n) if found < n => {
            Err(EngineError::MissingInput { id, kind })
        }
        Arity::Exactly(n) if found > n => Err(EngineError::TooManyInputs {
            id,
            kind,
            expected: n,
            found,
        }),
        _ => Ok(()),
    }
}

/// Gates on some cycle inside `stuck`: members of its non-trivial strongly
/// connected components (Kosaraju, with explicit stacks). Gates that are only
/// downstream of a cycle are left out.
fn cycle_members(stuck: &BTreeSet<GateId>, succs: &HashMap<GateId, Vec<GateId>>) -> Vec<GateId> {
    let fwd = |id: &GateId| -> Vec<GateId> {
        succs
            .get(id)
            .map(|v| v.iter().filter(|n| stuck.contains(n)).copied().collect())
            .unwrap_or_default()
    };
    let mut preds: HashMap<GateId, Vec<GateId>> = HashMap::new();
    for id in stuck {
        for n in fwd(id) {
            preds.entry(n).or_default().push(*id);
        }
    }

    // first pass: finish order
    let mut visited = BTreeSet::new();
    let mut finished = Vec::with_capacity(stuck.len());
    for root in stuck {
        if !visited.insert(*root) {
            continue;
        }
        let mut stack = vec![(*root, fwd(root), 0usize)];
        while let Some((node, next, pos)) = stack.last_mut() {
            if let Some(n) = next.get(*pos).copied() {
                *pos += 1;
                if visited.insert(n) {
                    let children = fwd(&n);
                    stack.push((n, children, 0));
                }
            } else {
                finished.push(*node);
                stack.pop();
            }
        }
    }

    // second pass: components on the transposed graph
    let mut assigned = BTreeSet::new();
    let mut members = Vec::new();
    for root in finished.iter().rev() {
        if !assigned.insert(*root) {
            continue;
        }
        let mut component = vec![*root];
        let mut stack = vec![*root];
        while let Some(node) = stack.pop() {
            for p in preds.get(&node).into_iter().flatten() {
                if assigned.insert(*p) {
                    component.push(*p);
                    stack.push(*p);
                }
            }
        }
        if component.len() > 1 {
            members.extend(component);
        }
    }
    members.sort();
    members
}
