pub mod orchestrator;
pub mod report;
pub mod state_machine;
pub mod types;

pub use orchestrator::RolloutOrchestrator;
pub use report::{ReportSummary, RolloutReport};
pub use state_machine::RolloutMachine;
pub use types::{RolloutRecord, RolloutResult, RolloutStep};
