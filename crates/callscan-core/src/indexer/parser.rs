//! Language parsing wrapper used by extraction passes.
//!
//! Python is the only language with a structural model; other eligible
//! languages are scanned and counted but never parsed.

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{CallscanError, CallscanResult};

/// Parse Python source into a syntax tree.
///
/// Tree-sitter recovers from syntax errors, but a tree that needed recovery
/// is treated as a failed parse so partial files never produce records.
pub fn parse_python(source: &str) -> CallscanResult<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| CallscanError::Parse(format!("Failed to set language: {e}")))?;

    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| CallscanError::Parse("Parser produced no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error(root).map(|n| n.start_position().row + 1).unwrap_or(1);
        return Err(CallscanError::Parse(format!("invalid syntax (line {line})")));
    }
    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

/// Source text of a node; empty on invalid UTF-8 boundaries.
pub fn node_text<'a>(node: &Node<'_>, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
