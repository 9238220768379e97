//! Call-site names that resolve to nothing declared or imported.

use std::collections::HashSet;

use crate::analysis::builtins::is_builtin;
use crate::models::{FunctionRecord, ImportRecord, Issue, IssueKind, Severity};

/// Every module name and every explicitly imported name in the project.
fn imported_names(imports: &[ImportRecord]) -> HashSet<&str> {
    let mut names = HashSet::new();
    for imp in imports {
        names.insert(imp.module.as_str());
        names.extend(imp.names.iter().map(String::as_str));
    }
    names
}

/// One issue per offending call occurrence, anchored at the caller.
pub fn find_broken_calls(functions: &[FunctionRecord], imports: &[ImportRecord]) -> Vec<Issue> {
    let declared: HashSet<&str> = functions.iter().map(|f| f.name.as_str()).collect();
    let imported = imported_names(imports);

    let mut issues = Vec::new();
    for func in functions {
        for called in &func.calls {
            if is_builtin(called) || called.starts_with('_') {
                continue;
            }
            if declared.contains(called.as_str()) || imported.contains(called.as_str()) {
                continue;
            }
            issues.push(Issue::at_function(
                IssueKind::BrokenCall,
                Severity::Error,
                func,
                format!("Calls undefined function '{called}'"),
            ));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(name: &str, calls: &[&str]) -> FunctionRecord {
        FunctionRecord {
            name: name.into(),
            file: "m.py".into(),
            line_start: 4,
            calls: calls.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn import(module: &str, names: &[&str]) -> ImportRecord {
        ImportRecord {
            file: "m.py".into(),
            line: 1,
            module: module.into(),
            names: names.iter().map(|n| n.to_string()).collect(),
            alias: None,
        }
    }

    #[test]
    fn test_one_issue_per_occurrence() {
        let funcs = vec![func("a", &["ghost", "ghost"])];
        let issues = find_broken_calls(&funcs, &[]);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.kind == IssueKind::BrokenCall));
        assert_eq!(issues[0].line, 4);
        assert_eq!(issues[0].message, "Calls undefined function 'ghost'");
    }

    #[test]
    fn test_known_names_skipped() {
        let funcs = vec![
            func("a", &["b", "print", "_helper", "loads", "path", "append"]),
            func("b", &[]),
        ];
        let imports = vec![import("json", &["loads"]), import("path", &["join"])];
        assert!(find_broken_calls(&funcs, &imports).is_empty());
    }

    #[test]
    fn test_declared_anywhere_silences() {
        let mut other = func("remote", &[]);
        other.file = "other.py".into();
        let funcs = vec![func("a", &["remote"]), other];
        assert!(find_broken_calls(&funcs, &[]).is_empty());
    }
}
