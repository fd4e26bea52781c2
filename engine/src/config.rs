use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

pub const DEFAULT_SOFT_INPUT_LIMIT: usize = 8;
pub const DEFAULT_HARD_INPUT_LIMIT: usize = 20;

/// Ceilings on how many inputs a truth table may span. Past `soft_limit` the
/// table is still built but a warning is logged; past `hard_limit` it is
/// refused before any row is evaluated. `None` disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruthTableConfig {
    pub soft_limit: Option<usize>,
    pub hard_limit: Option<usize>,
}

impl Default for TruthTableConfig {
    fn default() -> Self {
        Self {
            soft_limit: Some(DEFAULT_SOFT_INPUT_LIMIT),
            hard_limit: Some(DEFAULT_HARD_INPUT_LIMIT),
        }
    }
}

impl TruthTableConfig {
    pub fn unlimited() -> Self {
        Self {
            soft_limit: None,
            hard_limit: None,
        }
    }

    pub fn with_hard_limit(limit: usize) -> Self {
        Self {
            hard_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Errors past the hard limit. Returns whether the soft one was crossed.
    pub fn check(&self, inputs: usize) -> EngineResult<bool> {
        if let Some(limit) = self.hard_limit {
            if inputs > limit {
                return Err(EngineError::InputLimitExceeded { inputs, limit });
            }
        }
        Ok(self.soft_limit.is_some_and(|l| inputs > l))
    }
}
