//! Function, class, and import extraction from Python syntax trees.
//!
//! Every declaration at any depth is extracted: methods and nested functions
//! produce their own records. Call-site names are collected from the whole
//! sub-tree of a function, so calls made inside a nested function are also
//! attributed to every enclosing function.

use std::collections::VecDeque;

use tree_sitter::{Node, Tree};

use crate::errors::CallscanResult;
use crate::indexer::filesystem::PARSED_LANGUAGE;
use crate::indexer::parser::{node_text, parse_python};
use crate::models::{ClassRecord, FunctionRecord, ImportRecord, Record};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// 1-based inclusive line span of a node.
fn line_span(node: &Node<'_>) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    let line_start = start.row + 1;
    // A node ending at column 0 finished on the previous line.
    let line_end = if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    };
    (line_start, line_end)
}

/// Compound statements whose extent is decided by their last clause or block.
const COMPOUND_KINDS: &[&str] = &[
    "function_definition",
    "class_definition",
    "decorated_definition",
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
    "with_statement",
    "match_statement",
];

fn is_container(node: &Node<'_>) -> bool {
    let kind = node.kind();
    kind == "block" || kind.ends_with("_clause") || COMPOUND_KINDS.contains(&kind)
}

/// Deepest final statement under `node`, ignoring trailing comments.
///
/// tree-sitter keeps comments at block indentation inside the block, so a
/// definition's own extent can run past its last statement.
fn last_statement<'t>(node: Node<'t>) -> Node<'t> {
    let mut cursor = node.walk();
    let last = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .last();
    match last {
        Some(child) if is_container(&child) => last_statement(child),
        Some(child) => child,
        None => node,
    }
}

/// Byte offset of the end of the line containing `byte`.
fn line_end_byte(source: &str, byte: usize) -> usize {
    source
        .get(byte..)
        .and_then(|rest| rest.find('\n'))
        .map_or(source.len(), |offset| byte + offset)
}

/// Strip the prefix and quotes from a Python string literal.
fn string_literal_value(literal: &str) -> &str {
    let unprefixed = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if unprefixed.len() >= quote.len() * 2
            && unprefixed.starts_with(quote)
            && unprefixed.ends_with(quote)
        {
            return &unprefixed[quote.len()..unprefixed.len() - quote.len()];
        }
    }
    unprefixed
}

/// Normalize docstring indentation: first line stripped, common leading
/// whitespace of the remaining lines removed, blank edges dropped.
pub fn clean_docstring(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let lines: Vec<&str> = expanded.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines[1..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    cleaned.push(lines[0].trim().to_string());
    for line in &lines[1..] {
        let trimmed = line.get(margin..).unwrap_or_else(|| line.trim_start());
        cleaned.push(trimmed.trim_end().to_string());
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

/// First non-comment statement of a block.
fn first_statement<'t>(block: &Node<'t>) -> Option<Node<'t>> {
    let mut cursor = block.walk();
    let found = block
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    found
}

fn docstring_of(block: Option<Node<'_>>, source: &str) -> Option<String> {
    let stmt = first_statement(&block?)?;
    if stmt.kind() != "expression_statement" {
        return None;
    }
    let expr = stmt.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    Some(clean_docstring(string_literal_value(node_text(&expr, source))))
}

/// Simple callee name: bare identifier, or the trailing attribute name.
fn callee_name(function: &Node<'_>, source: &str) -> Option<String> {
    match function.kind() {
        "identifier" => Some(node_text(function, source).to_string()),
        "attribute" => function
            .child_by_field_name("attribute")
            .map(|attr| node_text(&attr, source).to_string()),
        _ => None,
    }
}

/// Breadth-first walk from `roots` collecting every call-site name.
fn collect_calls<'t>(roots: impl IntoIterator<Item = Node<'t>>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut queue: VecDeque<Node<'t>> = roots.into_iter().collect();
    while let Some(node) = queue.pop_front() {
        if node.kind() == "call" {
            if let Some(name) = node
                .child_by_field_name("function")
                .and_then(|f| callee_name(&f, source))
            {
                out.push(name);
            }
        }
        let mut cursor = node.walk();
        queue.extend(node.named_children(&mut cursor));
    }
    out
}

/// Ordinary positional-or-keyword parameter names.
fn parameter_names(params: &Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => names.push(node_text(&child, source).to_string()),
            "typed_parameter" => match child.named_child(0) {
                Some(inner) if inner.kind() == "identifier" => {
                    names.push(node_text(&inner, source).to_string())
                }
                _ => break,
            },
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = child.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        names.push(node_text(&name, source).to_string());
                    }
                }
            }
            // Everything before `/` is positional-only.
            "positional_separator" => names.clear(),
            "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => break,
            _ => {}
        }
    }
    names
}

/// `@name` for `@name` and `@name(...)`; other decorator shapes are skipped.
fn decorator_name(decorator: &Node<'_>, source: &str) -> Option<String> {
    let expr = decorator.named_child(0)?;
    match expr.kind() {
        "identifier" => Some(format!("@{}", node_text(&expr, source))),
        "call" => {
            let function = expr.child_by_field_name("function")?;
            (function.kind() == "identifier").then(|| format!("@{}", node_text(&function, source)))
        }
        _ => None,
    }
}

/// Decorator nodes attached to a definition, if it is wrapped.
fn decorators_of<'t>(definition: &Node<'t>) -> Vec<Node<'t>> {
    match definition.parent() {
        Some(parent) if parent.kind() == "decorated_definition" => {
            let mut cursor = parent.walk();
            let found: Vec<Node<'t>> = parent
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "decorator")
                .collect();
            found
        }
        _ => Vec::new(),
    }
}

/// True for `if __name__ == "__main__":` in either operand order.
fn is_main_guard(if_node: &Node<'_>, source: &str) -> bool {
    let Some(condition) = if_node.child_by_field_name("condition") else {
        return false;
    };
    if condition.kind() != "comparison_operator" {
        return false;
    }
    let normalized: String = node_text(&condition, source)
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\'' { '"' } else { c })
        .collect();
    normalized == "__name__==\"__main__\"" || normalized == "\"__main__\"==__name__"
}

/// Unwrap a `decorated_definition` to its inner definition.
fn unwrap_definition<'t>(node: Node<'t>) -> Node<'t> {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

// ---------------------------------------------------------------------------
// Python extraction
// ---------------------------------------------------------------------------

struct PythonExtractor<'s> {
    source: &'s str,
    lines: Vec<&'s str>,
    file_path: &'s str,
    records: Vec<Record>,
}

impl<'s> PythonExtractor<'s> {
    fn new(source: &'s str, file_path: &'s str) -> Self {
        Self {
            source,
            lines: source.split('\n').collect(),
            file_path,
            records: Vec::new(),
        }
    }

    fn visit(&mut self, node: Node<'_>, in_script_block: bool) {
        match node.kind() {
            "function_definition" => {
                let record = self.function(&node, in_script_block);
                self.records.push(Record::Function(record));
            }
            "class_definition" => {
                let record = self.class(&node, in_script_block);
                self.records.push(Record::Class(record));
            }
            "import_statement" => self.plain_import(&node),
            "import_from_statement" | "future_import_statement" => self.from_import(&node),
            _ => {}
        }

        let guard = node.kind() == "if_statement" && is_main_guard(&node, self.source);
        let consequence = if guard {
            node.child_by_field_name("consequence").map(|c| c.id())
        } else {
            None
        };

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            let flag = in_script_block || consequence == Some(child.id());
            self.visit(child, flag);
        }
    }

    fn function(&self, node: &Node<'_>, in_script_block: bool) -> FunctionRecord {
        let source = self.source;
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string())
            .unwrap_or_default();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| parameter_names(&p, source))
            .unwrap_or_default();
        let return_type = node
            .child_by_field_name("return_type")
            .map(|r| node_text(&r, source).to_string());

        let end = last_statement(*node);
        let line_start = node.start_position().row + 1;
        let line_end = line_span(&end).1.max(line_start);
        let code = self
            .lines
            .get(line_start - 1..line_end.min(self.lines.len()))
            .map(|slice| slice.join("\n"))
            .unwrap_or_default();

        let block = node.child_by_field_name("body");
        let mut cursor = node.walk();
        let colon_end = node
            .children(&mut cursor)
            .find(|c| c.kind() == ":")
            .map(|c| c.end_byte());
        let body = match (colon_end, block) {
            (Some(start), _) => source
                .get(start..line_end_byte(source, end.end_byte()).max(start))
                .unwrap_or(""),
            (None, Some(b)) => node_text(&b, source),
            (None, None) => "",
        }
        .to_string();

        let is_async = node.child(0).is_some_and(|c| c.kind() == "async");

        let decorator_nodes = decorators_of(node);
        let decorators = decorator_nodes
            .iter()
            .filter_map(|d| decorator_name(d, source))
            .collect();

        let calls = collect_calls(
            std::iter::once(*node).chain(decorator_nodes.iter().copied()),
            source,
        );

        FunctionRecord {
            name,
            file: self.file_path.to_string(),
            line_start,
            line_end,
            params,
            return_type,
            code,
            body,
            docstring: docstring_of(block, source),
            calls,
            is_async,
            decorators,
            in_script_block,
            description: None,
        }
    }

    fn class(&self, node: &Node<'_>, in_script_block: bool) -> ClassRecord {
        let source = self.source;
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string())
            .unwrap_or_default();
        let line_start = node.start_position().row + 1;
        let line_end = line_span(&last_statement(*node)).1.max(line_start);

        let mut bases = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for base in superclasses.named_children(&mut cursor) {
                if let Some(base_name) = callee_name(&base, source) {
                    bases.push(base_name);
                }
            }
        }

        let block = node.child_by_field_name("body");
        let mut methods = Vec::new();
        if let Some(body) = block {
            let mut cursor = body.walk();
            for item in body.named_children(&mut cursor) {
                let definition = unwrap_definition(item);
                if definition.kind() == "function_definition" {
                    methods.push(self.function(&definition, in_script_block));
                }
            }
        }

        ClassRecord {
            name,
            file: self.file_path.to_string(),
            line_start,
            line_end,
            methods,
            bases,
            docstring: docstring_of(block, source),
        }
    }

    /// `import a.b as c, d` → one record per imported module.
    fn plain_import(&mut self, node: &Node<'_>) {
        let line = node.start_position().row + 1;
        let mut cursor = node.walk();
        let items: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
        for item in items {
            let (module, alias) = self.aliased(&item);
            self.records.push(Record::Import(ImportRecord {
                file: self.file_path.to_string(),
                line,
                module: module.clone(),
                names: vec![module],
                alias,
            }));
        }
    }

    /// `from m import x, y as z` → a single record.
    fn from_import(&mut self, node: &Node<'_>) {
        let source = self.source;
        let line = node.start_position().row + 1;

        let module = if node.kind() == "future_import_statement" {
            "__future__".to_string()
        } else {
            match node.child_by_field_name("module_name") {
                Some(m) if m.kind() == "relative_import" => {
                    let mut cursor = m.walk();
                    let dotted = m
                        .named_children(&mut cursor)
                        .find(|c| c.kind() == "dotted_name")
                        .map(|d| node_text(&d, source).to_string());
                    dotted.unwrap_or_default()
                }
                Some(m) => node_text(&m, source).to_string(),
                None => String::new(),
            }
        };

        let mut names = Vec::new();
        let mut aliases = Vec::new();
        let mut cursor = node.walk();
        let items: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
        for item in items {
            let (name, alias) = self.aliased(&item);
            names.push(name);
            aliases.push(alias);
        }
        let mut cursor = node.walk();
        if node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import")
        {
            names.push("*".to_string());
            aliases.push(None);
        }

        let alias = if aliases.len() == 1 {
            aliases.pop().flatten()
        } else {
            None
        };

        self.records.push(Record::Import(ImportRecord {
            file: self.file_path.to_string(),
            line,
            module,
            names,
            alias,
        }));
    }

    fn aliased(&self, item: &Node<'_>) -> (String, Option<String>) {
        let source = self.source;
        if item.kind() == "aliased_import" {
            let name = item
                .child_by_field_name("name")
                .map(|n| node_text(&n, source).to_string())
                .unwrap_or_default();
            let alias = item
                .child_by_field_name("alias")
                .map(|a| node_text(&a, source).to_string());
            (name, alias)
        } else {
            (node_text(item, source).to_string(), None)
        }
    }
}

/// Extract every function, class and import record from a parsed Python tree.
pub fn extract_python(source: &str, file_path: &str, tree: &Tree) -> Vec<Record> {
    let mut extractor = PythonExtractor::new(source, file_path);
    extractor.visit(tree.root_node(), false);
    extractor.records
}

/// Parse and extract a single file.
///
/// # Arguments
///
/// * `source`    - Source code text.
/// * `file_path` - Root-relative path recorded on every produced record.
/// * `language`  - Detected language; only Python yields records.
pub fn extract_symbols(
    source: &str,
    file_path: &str,
    language: &str,
) -> CallscanResult<Vec<Record>> {
    if language != PARSED_LANGUAGE {
        return Ok(Vec::new());
    }
    let tree = parse_python(source)?;
    Ok(extract_python(source, file_path, &tree))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(src: &str) -> (Vec<FunctionRecord>, Vec<ClassRecord>, Vec<ImportRecord>) {
        let records = extract_symbols(src, "pkg/mod.py", "python").unwrap();
        let mut functions = Vec::new();
        let mut classes = Vec::new();
        let mut imports = Vec::new();
        for record in records {
            match record {
                Record::Function(f) => functions.push(f),
                Record::Class(c) => classes.push(c),
                Record::Import(i) => imports.push(i),
            }
        }
        (functions, classes, imports)
    }

    // -- Helper tests -------------------------------------------------------

    #[test]
    fn test_string_literal_value() {
        assert_eq!(string_literal_value("\"\"\"doc\"\"\""), "doc");
        assert_eq!(string_literal_value("'x'"), "x");
        assert_eq!(string_literal_value("r'''raw'''"), "raw");
    }

    #[test]
    fn test_clean_docstring() {
        let raw = "Summary line.\n\n        Details here.\n          indented\n    ";
        assert_eq!(
            clean_docstring(raw),
            "Summary line.\n\nDetails here.\n  indented"
        );
    }

    // -- Function extraction ------------------------------------------------

    #[test]
    fn test_function_basic_fields() {
        let src = "\
def add(a, b: int, c=1) -> int:
    \"\"\"Add numbers.\"\"\"
    return helper(a) + obj.method(b)
";
        let (functions, _, _) = extract(src);
        assert_eq!(functions.len(), 1);
        let f = &functions[0];
        assert_eq!(f.name, "add");
        assert_eq!(f.file, "pkg/mod.py");
        assert_eq!(f.line_start, 1);
        assert_eq!(f.line_end, 3);
        assert_eq!(f.params, vec!["a", "b", "c"]);
        assert_eq!(f.return_type.as_deref(), Some("int"));
        assert_eq!(f.docstring.as_deref(), Some("Add numbers."));
        assert_eq!(f.calls, vec!["helper", "method"]);
        assert!(!f.is_async);
        assert!(f.code.starts_with("def add("));
        assert!(f.code.ends_with("obj.method(b)"));
    }

    #[test]
    fn test_params_skip_varargs_and_kwonly() {
        let src = "def f(p, /, a, *args, k=1, **kw):\n    pass\n";
        let (functions, _, _) = extract(src);
        assert_eq!(functions[0].params, vec!["a"]);
    }

    #[test]
    fn test_body_is_text_after_colon() {
        let src = "def stub() -> int:\n    pass\n";
        let (functions, _, _) = extract(src);
        assert_eq!(functions[0].body.trim(), "pass");
        assert_eq!(functions[0].code, "def stub() -> int:\n    pass");
    }

    #[test]
    fn test_body_keeps_comments() {
        let src = "def f():\n    # TODO: finish\n    pass\n";
        let (functions, _, _) = extract(src);
        assert!(functions[0].body.contains("TODO"));
    }

    #[test]
    fn test_trailing_comment_outside_extent() {
        let src = "\
def f():
    pass

def g() -> int:
    x = 1  # keep
    # return x TODO
";
        let (functions, _, _) = extract(src);
        let g = &functions[1];
        assert_eq!((g.line_start, g.line_end), (4, 5));
        assert_eq!(g.code, "def g() -> int:\n    x = 1  # keep");
        assert_eq!(g.body, "\n    x = 1  # keep");
        assert!(!g.body.contains("return"));
    }

    #[test]
    fn test_trailing_comment_in_nested_block() {
        let src = "\
def h():
    if ready:
        go()
        # done
    # TODO later

def k():
    pass
";
        let (functions, _, _) = extract(src);
        assert_eq!(functions[0].line_end, 3);
        assert!(!functions[0].body.contains("TODO"));
        assert!(functions[0].body.ends_with("go()"));
    }

    #[test]
    fn test_async_and_decorators() {
        let src = "\
@cached
@route('/x')
@app.get('/y')
async def handler():
    await fetch()
";
        let (functions, _, _) = extract(src);
        assert_eq!(functions.len(), 1);
        let f = &functions[0];
        assert!(f.is_async);
        assert_eq!(f.decorators, vec!["@cached", "@route"]);
        assert_eq!(f.line_start, 4);
        assert_eq!(f.calls, vec!["route", "get", "fetch"]);
    }

    #[test]
    fn test_nested_calls_attributed_to_enclosing() {
        let src = "\
def outer():
    def inner():
        deep()
    inner()
";
        let (functions, _, _) = extract(src);
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "outer");
        assert_eq!(functions[0].calls, vec!["inner", "deep"]);
        assert_eq!(functions[1].name, "inner");
        assert_eq!(functions[1].calls, vec!["deep"]);
    }

    #[test]
    fn test_script_block_flag() {
        let src = "\
def lib():
    pass

if __name__ == '__main__':
    def cli():
        lib()
    cli()
";
        let (functions, _, _) = extract(src);
        let lib = functions.iter().find(|f| f.name == "lib").unwrap();
        let cli = functions.iter().find(|f| f.name == "cli").unwrap();
        assert!(!lib.in_script_block);
        assert!(cli.in_script_block);
    }

    #[test]
    fn test_other_if_is_not_script_block() {
        let src = "if DEBUG:\n    def dbg():\n        pass\n";
        let (functions, _, _) = extract(src);
        assert!(!functions[0].in_script_block);
    }

    // -- Class extraction ---------------------------------------------------

    #[test]
    fn test_class_methods_and_bases() {
        let src = "\
class Service(Base, abc.ABC, metaclass=Meta):
    \"\"\"A service.\"\"\"

    def __init__(self):
        self.start()

    @property
    def name(self):
        return 'svc'
";
        let (functions, classes, _) = extract(src);
        assert_eq!(classes.len(), 1);
        let c = &classes[0];
        assert_eq!(c.name, "Service");
        assert_eq!(c.bases, vec!["Base", "ABC"]);
        assert_eq!(c.docstring.as_deref(), Some("A service."));
        assert_eq!(c.line_start, 1);
        assert_eq!(c.line_end, 9);
        let method_names: Vec<&str> = c.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(method_names, vec!["__init__", "name"]);
        assert_eq!(c.methods[1].decorators, vec!["@property"]);
        // Methods are also top-level function records.
        assert_eq!(functions.len(), 2);
    }

    // -- Import extraction --------------------------------------------------

    #[test]
    fn test_plain_imports() {
        let src = "import os, numpy as np\nimport a.b\n";
        let (_, _, imports) = extract(src);
        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].module, "os");
        assert_eq!(imports[0].names, vec!["os"]);
        assert_eq!(imports[0].alias, None);
        assert_eq!(imports[1].module, "numpy");
        assert_eq!(imports[1].alias.as_deref(), Some("np"));
        assert_eq!(imports[2].module, "a.b");
        assert_eq!(imports[2].line, 2);
    }

    #[test]
    fn test_from_imports() {
        let src = "\
from os.path import join, split
from json import dumps as to_json
from . import sibling
from ..pkg import thing
from star import *
";
        let (_, _, imports) = extract(src);
        assert_eq!(imports.len(), 5);
        assert_eq!(imports[0].module, "os.path");
        assert_eq!(imports[0].names, vec!["join", "split"]);
        assert_eq!(imports[0].alias, None);
        assert_eq!(imports[1].names, vec!["dumps"]);
        assert_eq!(imports[1].alias.as_deref(), Some("to_json"));
        assert_eq!(imports[2].module, "");
        assert_eq!(imports[2].names, vec!["sibling"]);
        assert_eq!(imports[3].module, "pkg");
        assert_eq!(imports[4].names, vec!["*"]);
    }

    #[test]
    fn test_imports_inside_functions() {
        let src = "def f():\n    import json\n    return json.dumps({})\n";
        let (_, _, imports) = extract(src);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].line, 2);
    }

    // -- Language gating ----------------------------------------------------

    #[test]
    fn test_non_python_yields_nothing() {
        let records = extract_symbols("function f() {}", "a.js", "javascript").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_syntax_error_is_err() {
        assert!(extract_symbols("def broken(:\n", "a.py", "python").is_err());
    }
}
