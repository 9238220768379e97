//! Visualization dataset: graph nodes and edges, file tree, grouped issues
//! and summary counts.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{FunctionRecord, Issue, IssueKind, ParsedProject, Severity};

pub const COLOR_ERROR: &str = "#F44336";
pub const COLOR_WARNING: &str = "#FF9800";
pub const COLOR_INFO: &str = "#2196F3";
pub const COLOR_OK: &str = "#4CAF50";
const FONT_COLOR: &str = "#ffffff";
const EDGE_COLOR: &str = "#666666";

pub fn severity_color(severity: Option<Severity>) -> &'static str {
    match severity {
        Some(Severity::Error) => COLOR_ERROR,
        Some(Severity::Warning) => COLOR_WARNING,
        Some(Severity::Info) => COLOR_INFO,
        None => COLOR_OK,
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFont {
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub file: String,
    pub line: usize,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub calls: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// `file:name`; not unique when a file declares a name twice.
    pub id: String,
    pub label: String,
    /// Hover text: the description, or empty.
    pub title: String,
    pub group: String,
    pub color: String,
    pub font: NodeFont,
    pub data: NodeData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeColor {
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub arrows: String,
    pub color: EdgeColor,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTreeKind {
    Folder,
    File,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileTreeKind,
    #[serde(default)]
    pub children: Vec<FileTreeNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedIssues {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub info: Vec<Issue>,
}

impl GroupedIssues {
    /// Groups in display order with their labels.
    pub fn categories(&self) -> [(&'static str, &[Issue]); 3] {
        [
            ("errors", self.errors.as_slice()),
            ("warnings", self.warnings.as_slice()),
            ("info", self.info.as_slice()),
        ]
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_files: usize,
    pub total_functions: usize,
    pub total_classes: usize,
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    /// Issue count per kind, every kind present.
    pub by_kind: IndexMap<String, usize>,
}

/// Everything a report reader needs; persisted as one JSON document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub graph: GraphData,
    pub file_tree: Vec<FileTreeNode>,
    pub issues: GroupedIssues,
    pub stats: Stats,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

fn node_color(func: &FunctionRecord, issues: &[Issue]) -> &'static str {
    let worst = issues
        .iter()
        .filter(|i| i.file == func.file && i.function.as_deref() == Some(func.name.as_str()))
        .map(|i| i.severity)
        .min();
    severity_color(worst)
}

fn build_graph(functions: &[FunctionRecord], issues: &[Issue]) -> GraphData {
    let nodes: Vec<GraphNode> = functions
        .iter()
        .map(|func| {
            let description = func.description.clone().unwrap_or_default();
            GraphNode {
                id: func.node_id(),
                label: func.name.clone(),
                title: description.clone(),
                group: func.file.clone(),
                color: node_color(func, issues).to_string(),
                font: NodeFont {
                    color: FONT_COLOR.to_string(),
                },
                data: NodeData {
                    file: func.file.clone(),
                    line: func.line_start,
                    params: func.params.clone(),
                    code: func.code.clone(),
                    description,
                    calls: func.calls.clone(),
                },
            }
        })
        .collect();

    let mut ids_by_name: IndexMap<&str, Vec<String>> = IndexMap::new();
    for func in functions {
        ids_by_name
            .entry(func.name.as_str())
            .or_default()
            .push(func.node_id());
    }

    let mut edges = Vec::new();
    for func in functions {
        let from = func.node_id();
        for called in &func.calls {
            let Some(targets) = ids_by_name.get(called.as_str()) else {
                continue;
            };
            for to in targets {
                edges.push(GraphEdge {
                    from: from.clone(),
                    to: to.clone(),
                    arrows: "to".to_string(),
                    color: EdgeColor {
                        color: EDGE_COLOR.to_string(),
                    },
                });
            }
        }
    }

    info!("Graph data prepared: {} nodes, {} edges", nodes.len(), edges.len());
    GraphData { nodes, edges }
}

#[derive(Default)]
struct TreeBuilder(IndexMap<String, TreeBuilder>);

impl TreeBuilder {
    fn insert(&mut self, path: &str) {
        let mut current = self;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = current.0.entry(part.to_string()).or_default();
        }
    }

    fn into_nodes(self, parent: &str) -> Vec<FileTreeNode> {
        self.0
            .into_iter()
            .map(|(name, subtree)| {
                let path = if parent.is_empty() {
                    name.clone()
                } else {
                    format!("{parent}/{name}")
                };
                let (kind, children) = if subtree.0.is_empty() {
                    (FileTreeKind::File, vec![])
                } else {
                    (FileTreeKind::Folder, subtree.into_nodes(&path))
                };
                FileTreeNode {
                    name,
                    path,
                    kind,
                    children,
                }
            })
            .collect()
    }
}

/// Nested folders and files, in scan order.
pub fn build_file_tree<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<FileTreeNode> {
    let mut root = TreeBuilder::default();
    for path in paths {
        root.insert(path);
    }
    root.into_nodes("")
}

pub fn group_issues(issues: &[Issue]) -> GroupedIssues {
    let mut grouped = GroupedIssues::default();
    for issue in issues {
        let bucket = match issue.severity {
            Severity::Error => &mut grouped.errors,
            Severity::Warning => &mut grouped.warnings,
            Severity::Info => &mut grouped.info,
        };
        bucket.push(issue.clone());
    }
    for bucket in [&mut grouped.errors, &mut grouped.warnings, &mut grouped.info] {
        bucket.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    }
    grouped
}

fn build_stats(project: &ParsedProject, issues: &[Issue]) -> Stats {
    let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();
    let by_kind = IssueKind::ALL
        .iter()
        .map(|kind| {
            let n = issues.iter().filter(|i| i.kind == *kind).count();
            (kind.as_str().to_string(), n)
        })
        .collect();

    Stats {
        total_files: project.files_scanned(),
        total_functions: project.functions.len(),
        total_classes: project.classes.len(),
        total_issues: issues.len(),
        errors: count(Severity::Error),
        warnings: count(Severity::Warning),
        info: count(Severity::Info),
        by_kind,
    }
}

/// Build the full result from a (possibly described) project and its issues.
pub fn assemble(project: &ParsedProject, issues: &[Issue]) -> AnalysisResults {
    AnalysisResults {
        graph: build_graph(&project.functions, issues),
        file_tree: build_file_tree(project.files.iter().map(|f| f.path.as_str())),
        issues: group_issues(issues),
        stats: build_stats(project, issues),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassRecord, SourceFile};

    fn func(name: &str, file: &str, calls: &[&str]) -> FunctionRecord {
        FunctionRecord {
            name: name.into(),
            file: file.into(),
            line_start: 1,
            calls: calls.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn issue(kind: IssueKind, severity: Severity, file: &str, line: usize, function: Option<&str>) -> Issue {
        Issue {
            kind,
            severity,
            file: file.into(),
            line,
            function: function.map(String::from),
            message: String::new(),
        }
    }

    fn source_file(path: &str) -> SourceFile {
        SourceFile {
            path: path.into(),
            language: "python".into(),
            size_bytes: 0,
            content_hash: String::new(),
        }
    }

    #[test]
    fn test_ambiguous_call_fans_out() {
        let functions = vec![
            func("main", "app.py", &["run", "print"]),
            func("run", "a.py", &[]),
            func("run", "b.py", &[]),
        ];
        let graph = build_graph(&functions, &[]);
        assert_eq!(graph.nodes.len(), 3);
        let targets: Vec<&str> = graph.edges.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(targets, vec!["a.py:run", "b.py:run"]);
        assert!(graph.edges.iter().all(|e| e.from == "app.py:main" && e.arrows == "to"));
    }

    #[test]
    fn test_node_color_worst_severity_same_file_only() {
        let functions = vec![func("f", "a.py", &[]), func("f", "b.py", &[])];
        let issues = vec![
            issue(IssueKind::Placeholder, Severity::Info, "a.py", 1, Some("f")),
            issue(IssueKind::MissingReturn, Severity::Error, "a.py", 1, Some("f")),
        ];
        let graph = build_graph(&functions, &issues);
        assert_eq!(graph.nodes[0].color, COLOR_ERROR);
        assert_eq!(graph.nodes[1].color, COLOR_OK);
        assert_eq!(graph.nodes[0].font.color, "#ffffff");
    }

    #[test]
    fn test_file_tree_nesting() {
        let tree = build_file_tree(["main.py", "pkg/a.py", "pkg/sub/b.py"]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].kind, FileTreeKind::File);
        let pkg = &tree[1];
        assert_eq!(pkg.kind, FileTreeKind::Folder);
        assert_eq!(pkg.path, "pkg");
        assert_eq!(pkg.children[0].path, "pkg/a.py");
        assert_eq!(pkg.children[1].children[0].path, "pkg/sub/b.py");
    }

    #[test]
    fn test_group_issues_sorted_by_file_and_line() {
        let issues = vec![
            issue(IssueKind::DeadCode, Severity::Warning, "b.py", 1, Some("x")),
            issue(IssueKind::DeadCode, Severity::Warning, "a.py", 9, Some("y")),
            issue(IssueKind::DeadCode, Severity::Warning, "a.py", 2, Some("z")),
            issue(IssueKind::UnusedImport, Severity::Info, "a.py", 0, None),
        ];
        let grouped = group_issues(&issues);
        let order: Vec<(&str, usize)> = grouped
            .warnings
            .iter()
            .map(|i| (i.file.as_str(), i.line))
            .collect();
        assert_eq!(order, vec![("a.py", 2), ("a.py", 9), ("b.py", 1)]);
        assert_eq!(grouped.info.len(), 1);
        assert!(grouped.errors.is_empty());
        assert_eq!(grouped.len(), 4);
    }

    #[test]
    fn test_stats_counts() {
        let project = ParsedProject {
            files: vec![source_file("a.py"), source_file("web/app.ts")],
            functions: vec![func("a", "a.py", &[])],
            classes: vec![ClassRecord::default()],
            ..Default::default()
        };
        let issues = vec![
            issue(IssueKind::DeadCode, Severity::Warning, "a.py", 1, Some("a")),
            issue(IssueKind::UnusedImport, Severity::Info, "a.py", 0, None),
        ];
        let results = assemble(&project, &issues);
        let stats = &results.stats;
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_functions, 1);
        assert_eq!(stats.total_classes, 1);
        assert_eq!(stats.total_issues, 2);
        assert_eq!((stats.errors, stats.warnings, stats.info), (0, 1, 1));
        assert_eq!(stats.by_kind["dead_code"], 1);
        assert_eq!(stats.by_kind["broken_call"], 0);
        assert_eq!(stats.by_kind.len(), 5);
        assert_eq!(results.file_tree.len(), 2);
    }
}
