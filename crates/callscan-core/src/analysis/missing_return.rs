//! Annotated return types with no `return` anywhere in the body text.
//!
//! This is a substring test, not control flow: a `return` inside a comment or
//! string literal suppresses the issue.

use crate::models::{FunctionRecord, Issue, IssueKind, Severity};

pub fn find_missing_returns(functions: &[FunctionRecord]) -> Vec<Issue> {
    functions
        .iter()
        .filter(|f| f.declares_return_value() && !f.body.contains("return"))
        .map(|f| {
            Issue::at_function(
                IssueKind::MissingReturn,
                Severity::Error,
                f,
                format!(
                    "Function expects return type '{}' but has no return",
                    f.return_type.as_deref().unwrap_or_default()
                ),
            )
        })
        .collect()
}
