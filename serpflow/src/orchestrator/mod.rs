//! Job orchestration.

mod job;
mod pool;

pub use job::SearchJob;
pub use pool::{JobOrchestrator, OrchestratorConfig};
