use std::fmt;

use crate::types::{GateId, GateKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    pub id: GateId,
    pub kind: GateKind,
    pub label: Option<String>,
    pub(crate) value: bool,
}

impl Gate {
    pub(crate) fn new(id: GateId, kind: GateKind, label: Option<String>) -> Gate {
        Gate {
            id,
            kind,
            label,
            value: false,
        }
    }

    pub fn value(&self) -> bool {
        self.value
    }

    /// Label if one was given, otherwise the kind followed by the id.
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(l) if !l.is_empty() => l.clone(),
            _ => format!("{}{}", self.kind, self.id.0),
        }
    }
}

impl GateKind {
    /// Applies the kind's boolean function to its ordered input values.
    /// Arity has already been checked by the time a plan runs, so single
    /// input kinds only look at the first value.
    pub fn reduce<I>(&self, inputs: I) -> bool
    where
        I: IntoIterator<Item = bool>,
    {
        let mut inputs = inputs.into_iter();
        match self {
            GateKind::Input => false,
            GateKind::Output => inputs.next().unwrap_or(false),
            GateKind::Not => !inputs.next().unwrap_or(false),
            GateKind::And => inputs.all(|v| v),
            GateKind::Or => inputs.any(|v| v),
            // parity, so 2-input xor generalizes to n inputs
            GateKind::Xor => inputs.filter(|v| *v).count() % 2 == 1,
            GateKind::Nand => !inputs.all(|v| v),
            GateKind::Nor => !inputs.any(|v| v),
        }
    }

    /// Operator symbol used when rendering expressions.
    pub fn symbol(&self) -> &'static str {
        match self {
            GateKind::Input | GateKind::Output => "",
            GateKind::Not => "!",
            GateKind::And | GateKind::Nand => ".",
            GateKind::Or | GateKind::Nor => "+",
            GateKind::Xor => "^",
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!(self, GateKind::Not | GateKind::Nand | GateKind::Nor)
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = if self.value {
            "\x1b[32mON\x1b[0m" // Green text for ON
        } else {
            "\x1b[31mOFF\x1b[0m" // Red text for OFF
        };
        write!(
            f,
            "{} [{}] - State: {}",
            self.display_name(),
            self.kind,
            state_str
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red(kind: GateKind, v: &[bool]) -> bool {
        kind.reduce(v.iter().copied())
    }

    #[test]
    fn gate_functions() {
        assert!(red(GateKind::And, &[true, true, true]));
        assert!(!red(GateKind::And, &[true, false]));
        assert!(red(GateKind::Or, &[false, true]));
        assert!(!red(GateKind::Or, &[false, false, false]));
        assert!(red(GateKind::Nand, &[true, false]));
        assert!(!red(GateKind::Nor, &[false, true]));
        assert!(red(GateKind::Nor, &[false]));
        assert!(red(GateKind::Not, &[false]));
        assert!(red(GateKind::Output, &[true]));
    }

    #[test]
    fn xor_is_parity() {
        assert!(!red(GateKind::Xor, &[true, true]));
        assert!(red(GateKind::Xor, &[true, true, true]));
        assert!(red(GateKind::Xor, &[false, true, false]));
        assert!(!red(GateKind::Xor, &[false]));
    }

    #[test]
    fn display_name_falls_back_to_kind() {
        let g = Gate::new(GateId(3), GateKind::And, None);
        assert_eq!(g.display_name(), "AND3");
        let g = Gate::new(GateId(3), GateKind::Input, Some("A".into()));
        assert_eq!(g.display_name(), "A");
    }
}
