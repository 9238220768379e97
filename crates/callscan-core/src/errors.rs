//! Error types for the callscan core library.

/// Top-level error enum for the callscan core library.
///
/// File-level problems (oversized, undecodable or unparsable sources) never
/// surface here; they are recorded as [`crate::models::FileFailure`] entries
/// and the scan continues.
#[derive(Debug, thiserror::Error)]
pub enum CallscanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Description service error: {0}")]
    Describe(String),

    #[error("Unknown run: {0}")]
    RunNotFound(String),

    #[error("No results available: {0}")]
    NoResults(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CallscanResult<T> = Result<T, CallscanError>;
