//! Heuristic issue detection over a parsed project.
//!
//! Each pass reads only the project model and the call graph, never another
//! pass's output, and none of them can fail.

pub mod broken_calls;
pub mod builtins;
pub mod dead_code;
pub mod missing_return;
pub mod placeholders;
pub mod unused_imports;

use tracing::info;

use crate::indexer::callgraph::CallGraph;
use crate::models::{Issue, ParsedProject};

pub use broken_calls::find_broken_calls;
pub use dead_code::find_dead_code;
pub use missing_return::find_missing_returns;
pub use placeholders::find_placeholders;
pub use unused_imports::find_unused_imports;

/// Run every pass and concatenate their findings.
pub fn analyze(project: &ParsedProject, graph: &CallGraph) -> Vec<Issue> {
    let functions = &project.functions;
    let mut issues = Vec::new();
    issues.extend(find_dead_code(functions, graph));
    issues.extend(find_broken_calls(functions, &project.imports));
    issues.extend(find_placeholders(functions));
    issues.extend(find_missing_returns(functions));
    issues.extend(find_unused_imports(functions, &project.imports));
    info!("Found {} issues", issues.len());
    issues
}
