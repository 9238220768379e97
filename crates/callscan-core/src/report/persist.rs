//! JSON persistence of assembled results.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::errors::CallscanResult;
use crate::report::assemble::AnalysisResults;

/// Write `results` as pretty-printed JSON, creating parent directories.
pub fn save_results(results: &AnalysisResults, output: &Path) -> CallscanResult<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(results)?;
    fs::write(output, text)?;
    info!("Results saved to {}", output.display());
    Ok(())
}

pub fn load_results(input: &Path) -> CallscanResult<AnalysisResults> {
    let text = fs::read_to_string(input)?;
    Ok(serde_json::from_str(&text)?)
}
