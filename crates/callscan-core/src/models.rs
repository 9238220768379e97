//! Shared typed models used across extraction, analysis, and reporting layers.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 1. SourceFile
// ---------------------------------------------------------------------------

/// A single eligible file found by the scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Root-relative path with `/` separators.
    pub path: String,
    pub language: String,
    pub size_bytes: u64,
    pub content_hash: String,
}

// ---------------------------------------------------------------------------
// 2. FunctionRecord
// ---------------------------------------------------------------------------

/// A function or method declaration extracted from source.
///
/// Unique within a project by `(file, name, line_start)`; the bare `name` is
/// not unique since methods of different classes and functions in different
/// files may share it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub file: String,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub return_type: Option<String>,
    /// Verbatim source lines `line_start..=line_end`.
    #[serde(default)]
    pub code: String,
    /// Verbatim text following the signature colon.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub docstring: Option<String>,
    /// Call-site names in walk order, duplicates kept.
    #[serde(default)]
    pub calls: Vec<String>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub decorators: Vec<String>,
    #[serde(default)]
    pub in_script_block: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl FunctionRecord {
    /// Identifier used by the visualization graph: `file:name`.
    pub fn node_id(&self) -> String {
        format!("{}:{}", self.file, self.name)
    }

    /// True when the return annotation names something other than `None`.
    pub fn declares_return_value(&self) -> bool {
        matches!(self.return_type.as_deref(), Some(t) if !t.is_empty() && t != "None")
    }
}

// ---------------------------------------------------------------------------
// 3. ClassRecord
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    pub file: String,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default)]
    pub methods: Vec<FunctionRecord>,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub docstring: Option<String>,
}

// ---------------------------------------------------------------------------
// 4. ImportRecord
// ---------------------------------------------------------------------------

/// One import statement (or one alias of a plain `import a, b`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub file: String,
    pub line: usize,
    pub module: String,
    /// Imported names; the module name itself for plain imports.
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

// ---------------------------------------------------------------------------
// 5. Extraction output
// ---------------------------------------------------------------------------

/// Records produced for one file by the extractor.
#[derive(Clone, Debug)]
pub enum Record {
    Function(FunctionRecord),
    Class(ClassRecord),
    Import(ImportRecord),
}

/// Stage at which a file was dropped from the scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Read,
    TooLarge,
    Decode,
    Parse,
}

/// A file skipped during extraction; recorded for diagnostics only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Read-only aggregate of a full project scan.
#[derive(Clone, Debug, Default)]
pub struct ParsedProject {
    pub files: Vec<SourceFile>,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub imports: Vec<ImportRecord>,
    pub failures: Vec<FileFailure>,
}

impl ParsedProject {
    pub fn files_scanned(&self) -> usize {
        self.files.len()
    }

    /// Fold one file's records into the aggregate, preserving order.
    pub fn absorb(&mut self, records: Vec<Record>) {
        for record in records {
            match record {
                Record::Function(f) => self.functions.push(f),
                Record::Class(c) => self.classes.push(c),
                Record::Import(i) => self.imports.push(i),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 6. Issue
// ---------------------------------------------------------------------------

/// Ordered worst-first, so `min()` over a set of severities is the worst one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DeadCode,
    BrokenCall,
    Placeholder,
    MissingReturn,
    UnusedImport,
}

impl IssueKind {
    pub const ALL: [IssueKind; 5] = [
        IssueKind::DeadCode,
        IssueKind::BrokenCall,
        IssueKind::Placeholder,
        IssueKind::MissingReturn,
        IssueKind::UnusedImport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::DeadCode => "dead_code",
            IssueKind::BrokenCall => "broken_call",
            IssueKind::Placeholder => "placeholder",
            IssueKind::MissingReturn => "missing_return",
            IssueKind::UnusedImport => "unused_import",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An advisory finding. Refers to code by file/line/name only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub file: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub message: String,
}

impl Issue {
    /// Issue anchored at a function's declaration line.
    pub fn at_function(
        kind: IssueKind,
        severity: Severity,
        func: &FunctionRecord,
        message: String,
    ) -> Self {
        Self {
            kind,
            severity,
            file: func.file.clone(),
            line: func.line_start,
            function: Some(func.name.clone()),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
