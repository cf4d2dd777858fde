pub mod engine;
pub mod importer;
pub mod matcher;
pub mod rules;

pub use engine::{Engine, EngineConfig, EngineError, Ledger};
pub use importer::{FileOutcome, ImportOutcome, ImportReport, StatementFile};
pub use matcher::MatchPair;
