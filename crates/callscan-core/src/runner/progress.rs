//! Run progress reports.

use serde::{Deserialize, Serialize};

/// Progress value recorded when a run fails.
pub const FAILED_PROGRESS: f64 = -1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Error,
}

/// Snapshot of a run: status, human-readable message and a 0..=100
/// percentage, or -1 after a failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub status: RunStatus,
    pub message: String,
    pub progress: f64,
}

impl ProgressReport {
    /// Status follows from the value: 100 completes, negative fails.
    pub fn at(message: impl Into<String>, progress: f64) -> Self {
        let status = if progress < 0.0 {
            RunStatus::Error
        } else if progress >= 100.0 {
            RunStatus::Completed
        } else {
            RunStatus::Running
        };
        Self {
            status,
            message: message.into(),
            progress,
        }
    }

    pub fn starting() -> Self {
        Self::at("Starting analysis...", 0.0)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::at(message, FAILED_PROGRESS)
    }

    pub fn is_finished(&self) -> bool {
        self.status != RunStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_progress() {
        assert_eq!(ProgressReport::at("x", 40.0).status, RunStatus::Running);
        assert_eq!(ProgressReport::at("x", 100.0).status, RunStatus::Completed);
        assert_eq!(ProgressReport::failed("Error: boom").status, RunStatus::Error);
        assert!(!ProgressReport::starting().is_finished());
    }

    #[test]
    fn test_serializes_lowercase_status() {
        let value = serde_json::to_value(ProgressReport::at("done", 100.0)).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["progress"], 100.0);
    }
}
