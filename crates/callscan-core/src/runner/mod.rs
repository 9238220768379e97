//! Orchestration of full runs and the background run service.

pub mod orchestrator;
pub mod progress;
pub mod service;
pub mod store;

pub use orchestrator::ProjectAnalyzer;
pub use progress::{ProgressReport, RunStatus};
pub use service::{AnalysisRequest, AnalysisService};
pub use store::{InMemoryRunStore, RunState, RunStore};
