use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Identifies a gate. Handed out in increasing order, so comparing two ids
/// compares their creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateId(pub u32);

/// Identifies a connection. Also monotonic: ascending id is insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u32);

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateKind {
    Input,
    Output,
    Not,
    And,
    Or,
    Xor,
    Nand,
    Nor,
}

/// How many incoming connections a kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    Exactly(usize),
    AtLeast(usize),
}

/// Which end of a directed edge a port check was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEnd {
    Source,
    Destination,
}

impl GateKind {
    pub const ALL: [GateKind; 8] = [
        GateKind::Input,
        GateKind::Output,
        GateKind::Not,
        GateKind::And,
        GateKind::Or,
        GateKind::Xor,
        GateKind::Nand,
        GateKind::Nor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GateKind::Input => "INPUT",
            GateKind::Output => "OUTPUT",
            GateKind::Not => "NOT",
            GateKind::And => "AND",
            GateKind::Or => "OR",
            GateKind::Xor => "XOR",
            GateKind::Nand => "NAND",
            GateKind::Nor => "NOR",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            GateKind::Input => Arity::None,
            GateKind::Output | GateKind::Not => Arity::Exactly(1),
            GateKind::And | GateKind::Or | GateKind::Xor | GateKind::Nand | GateKind::Nor => {
                Arity::AtLeast(1)
            }
        }
    }

    /// Inputs have no incoming port.
    pub fn has_input_port(&self) -> bool {
        !matches!(self, GateKind::Input)
    }

    /// Outputs are sinks and have no outgoing port.
    pub fn has_output_port(&self) -> bool {
        !matches!(self, GateKind::Output)
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GateKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INPUT" | "IN" => Ok(GateKind::Input),
            "OUTPUT" | "OUT" => Ok(GateKind::Output),
            "NOT" => Ok(GateKind::Not),
            "AND" => Ok(GateKind::And),
            "OR" => Ok(GateKind::Or),
            "XOR" => Ok(GateKind::Xor),
            "NAND" => Ok(GateKind::Nand),
            "NOR" => Ok(GateKind::Nor),
            _ => Err(EngineError::InvalidKind {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_names_and_aliases() {
        assert_eq!("and".parse::<GateKind>().unwrap(), GateKind::And);
        assert_eq!(" IN ".parse::<GateKind>().unwrap(), GateKind::Input);
        assert_eq!("Out".parse::<GateKind>().unwrap(), GateKind::Output);
        for kind in GateKind::ALL {
            assert_eq!(kind.name().parse::<GateKind>().unwrap(), kind);
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = "JK".parse::<GateKind>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidKind { name } if name == "JK"));
    }

    #[test]
    fn port_rules() {
        assert!(!GateKind::Input.has_input_port());
        assert!(!GateKind::Output.has_output_port());
        assert!(GateKind::Not.has_input_port() && GateKind::Not.has_output_port());
        assert_eq!(GateKind::Output.arity(), Arity::Exactly(1));
        assert_eq!(GateKind::Xor.arity(), Arity::AtLeast(1));
    }
}
