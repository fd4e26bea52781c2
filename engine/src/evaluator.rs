use log::trace;

use crate::{
    errors::{EngineError, EngineResult},
    registry::GateRegistry,
    resolver::EvalPlan,
    types::GateKind,
};

/// Current gate values laid out in plan slots.
pub fn load_values(plan: &EvalPlan, gates: &GateRegistry) -> Vec<bool> {
    plan.order()
        .iter()
        .map(|id| gates.value(*id).unwrap_or(false))
        .collect()
}

/// Walks the plan once. Input slots are left as they are; every other slot
/// is overwritten from slots earlier in the order, so no value is stale.
pub fn run_plan(plan: &EvalPlan, values: &mut [bool]) {
    for (slot, step) in plan.steps.iter().enumerate() {
        if step.kind == GateKind::Input {
            continue;
        }
        let v = step.kind.reduce(step.sources.iter().map(|s| values[*s]));
        values[slot] = v;
    }
}

/// Writes a finished buffer back, inputs included. A plan resolved against
/// some other registry is refused before anything is written.
pub fn commit_values(
    plan: &EvalPlan,
    values: &[bool],
    gates: &mut GateRegistry,
) -> EngineResult<()> {
    if let Some(id) = plan.order().iter().find(|id| !gates.contains(**id)) {
        return Err(EngineError::UnknownGate { id: *id });
    }
    for (id, v) in plan.order().iter().zip(values) {
        gates.write_value(*id, *v)?;
    }
    Ok(())
}

/// One full simulation pass. Values land in the registry only after the
/// whole pass.
pub fn evaluate(plan: &EvalPlan, gates: &mut GateRegistry) -> EngineResult<()> {
    let mut values = load_values(plan, gates);
    run_plan(plan, &mut values);
    commit_values(plan, &values, gates)?;
    trace!("evaluated {} gates", plan.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connections::ConnectionSet, resolver::resolve};

    #[test]
    fn downstream_gates_see_fresh_values() {
        // insertion order deliberately lists the deepest edge first
        let mut g = GateRegistry::new();
        let i = g.create(GateKind::Input, None).unwrap();
        let a1 = g.create(GateKind::And, None).unwrap();
        let a2 = g.create(GateKind::And, None).unwrap();
        let out = g.create(GateKind::Output, None).unwrap();
        let mut e = ConnectionSet::new();
        e.connect(&g, a2, out).unwrap();
        e.connect(&g, a1, a2).unwrap();
        e.connect(&g, i, a1).unwrap();
        let plan = resolve(&g, &e).unwrap();

        g.set_input_value(i, true).unwrap();
        evaluate(&plan, &mut g).unwrap();
        assert!(g.value(out).unwrap());

        g.set_input_value(i, false).unwrap();
        evaluate(&plan, &mut g).unwrap();
        assert!(!g.value(a1).unwrap());
        assert!(!g.value(out).unwrap());
    }

    #[test]
    fn run_plan_on_private_buffer_leaves_registry_alone() {
        let mut g = GateRegistry::new();
        let i = g.create(GateKind::Input, None).unwrap();
        let n = g.create(GateKind::Not, None).unwrap();
        let mut e = ConnectionSet::new();
        e.connect(&g, i, n).unwrap();
        let plan = resolve(&g, &e).unwrap();

        let mut buf = load_values(&plan, &g);
        run_plan(&plan, &mut buf);
        assert_eq!(buf, vec![false, true]);
        assert!(!g.value(n).unwrap());
    }

    #[test]
    fn commit_refuses_a_plan_from_another_registry() {
        let mut g = GateRegistry::new();
        let i = g.create(GateKind::Input, None).unwrap();
        let n = g.create(GateKind::Not, None).unwrap();
        let mut e = ConnectionSet::new();
        e.connect(&g, i, n).unwrap();
        let plan = resolve(&g, &e).unwrap();

        let mut other = GateRegistry::new();
        let only = other.create(GateKind::Input, None).unwrap();
        assert_eq!(only, i);
        assert!(matches!(
            commit_values(&plan, &[true, false], &mut other),
            Err(EngineError::UnknownGate { id }) if id == n
        ));
        assert!(!other.value(only).unwrap());
        assert!(matches!(
            evaluate(&plan, &mut other),
            Err(EngineError::UnknownGate { .. })
        ));
    }
}
