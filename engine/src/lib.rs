pub mod circuit;
pub mod components;
pub mod config;
pub mod connections;
pub mod errors;
pub mod evaluator;
pub mod registry;
pub mod resolver;
pub mod snapshot;
pub mod table;
pub mod types;
pub mod utils;

pub use circuit::Circuit;
pub use config::TruthTableConfig;
pub use errors::{EngineError, EngineResult};
pub use table::{TruthRow, TruthTable};
pub use types::{ConnectionId, GateId, GateKind};
