//! Imported names that no function in the same file calls.
//!
//! Only call targets count as uses, so a name referenced as a value or type
//! annotation is still reported. Issues carry line 0.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::models::{FunctionRecord, ImportRecord, Issue, IssueKind, Severity};

pub fn find_unused_imports(functions: &[FunctionRecord], imports: &[ImportRecord]) -> Vec<Issue> {
    let mut imports_by_file: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for imp in imports {
        imports_by_file
            .entry(imp.file.as_str())
            .or_default()
            .extend(imp.names.iter().map(String::as_str));
    }

    let mut issues = Vec::new();
    for (file, names) in imports_by_file {
        let used: HashSet<&str> = functions
            .iter()
            .filter(|f| f.file == file)
            .flat_map(|f| f.calls.iter().map(String::as_str))
            .collect();

        for name in names {
            if used.contains(name) {
                continue;
            }
            issues.push(Issue {
                kind: IssueKind::UnusedImport,
                severity: Severity::Info,
                file: file.to_string(),
                line: 0,
                function: None,
                message: format!("Import '{name}' is not used"),
            });
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(file: &str, names: &[&str]) -> ImportRecord {
        ImportRecord {
            file: file.into(),
            line: 1,
            module: names.first().map(|s| s.to_string()).unwrap_or_default(),
            names: names.iter().map(|n| n.to_string()).collect(),
            alias: None,
        }
    }

    fn func(file: &str, calls: &[&str]) -> FunctionRecord {
        FunctionRecord {
            name: "f".into(),
            file: file.into(),
            calls: calls.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unused_import_at_line_zero() {
        let issues = find_unused_imports(&[func("a.py", &[])], &[import("a.py", &["os"])]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 0);
        assert_eq!(issues[0].file, "a.py");
        assert_eq!(issues[0].function, None);
        assert_eq!(issues[0].message, "Import 'os' is not used");
    }

    #[test]
    fn test_called_name_in_same_file_suppresses() {
        let issues = find_unused_imports(
            &[func("a.py", &["loads"])],
            &[import("a.py", &["loads", "dumps"])],
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Import 'dumps' is not used");
    }

    #[test]
    fn test_call_in_other_file_does_not_count() {
        let issues = find_unused_imports(&[func("b.py", &["os"])], &[import("a.py", &["os"])]);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_duplicate_imports_each_reported() {
        let issues = find_unused_imports(
            &[],
            &[import("a.py", &["sys"]), import("a.py", &["sys"])],
        );
        assert_eq!(issues.len(), 2);
    }
}
