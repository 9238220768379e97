//! Stub bodies and unfinished-work markers, found by plain text search.

use crate::models::{FunctionRecord, Issue, IssueKind, Severity};

const NO_OP: &str = "pass";
const MARKERS: &[&str] = &["TODO", "FIXME"];
const NOT_IMPLEMENTED: &str = "NotImplementedError";

/// Each check is independent; a function may yield up to three issues.
pub fn find_placeholders(functions: &[FunctionRecord]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for func in functions {
        let body = func.body.as_str();

        if body.trim() == NO_OP {
            issues.push(Issue::at_function(
                IssueKind::Placeholder,
                Severity::Warning,
                func,
                format!("Function '{}' is empty (only 'pass')", func.name),
            ));
        }

        if MARKERS.iter().any(|m| body.contains(m)) {
            issues.push(Issue::at_function(
                IssueKind::Placeholder,
                Severity::Info,
                func,
                format!("Function '{}' has TODO/FIXME comment", func.name),
            ));
        }

        if body.contains(NOT_IMPLEMENTED) {
            issues.push(Issue::at_function(
                IssueKind::Placeholder,
                Severity::Warning,
                func,
                format!("Function '{}' raises NotImplementedError", func.name),
            ));
        }
    }
    issues
}
