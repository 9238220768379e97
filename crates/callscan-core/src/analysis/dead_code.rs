//! Functions that nothing in the project calls.

use crate::indexer::callgraph::CallGraph;
use crate::models::{FunctionRecord, Issue, IssueKind, Severity};

/// Names invoked by the runtime rather than by project code.
pub const ENTRY_POINTS: &[&str] = &[
    "main", "__init__", "__main__", "__new__", "__str__", "__repr__", "__call__",
];

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

fn is_exempt(func: &FunctionRecord) -> bool {
    ENTRY_POINTS.contains(&func.name.as_str()) || is_dunder(&func.name) || func.in_script_block
}

/// Liveness is project-wide and name-only: a call to `name` from any file
/// keeps every function called `name` alive.
pub fn find_dead_code(functions: &[FunctionRecord], graph: &CallGraph) -> Vec<Issue> {
    functions
        .iter()
        .filter(|f| !is_exempt(f) && graph.in_degree(&f.name) == 0)
        .map(|f| {
            Issue::at_function(
                IssueKind::DeadCode,
                Severity::Warning,
                f,
                format!("Function '{}' is never called", f.name),
            )
        })
        .collect()
}
