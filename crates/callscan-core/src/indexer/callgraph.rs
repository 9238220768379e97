//! Name-keyed call graph built from extracted function records.
//!
//! Nodes are the distinct declared function names. Every call-site name of a
//! function becomes an edge `caller -> callee`, deduplicated per pair, so the
//! in-degree of a name is the number of distinct declared names that call it.
//! Callees need not be declared; such dangling targets are kept as edges but
//! never become nodes.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::models::FunctionRecord;

/// A single deduplicated call edge between two names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    nodes: IndexSet<String>,
    edges: IndexSet<CallEdge>,
    in_degree: HashMap<String, usize>,
    adjacency: IndexMap<String, Vec<String>>,
}

impl CallGraph {
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = &CallEdge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct callers of `name`; zero for unknown names.
    pub fn in_degree(&self, name: &str) -> usize {
        self.in_degree.get(name).copied().unwrap_or(0)
    }

    /// Declared name to the call-site names of every function with that name,
    /// in declaration order. Same-named functions share one entry.
    pub fn adjacency(&self) -> &IndexMap<String, Vec<String>> {
        &self.adjacency
    }

    fn add_edge(&mut self, caller: &str, callee: &str) {
        let edge = CallEdge {
            caller: caller.to_string(),
            callee: callee.to_string(),
        };
        if self.edges.insert(edge) {
            *self.in_degree.entry(callee.to_string()).or_insert(0) += 1;
        }
    }
}

/// Build the call graph. Pure: the same records always yield an equal graph.
pub fn build_call_graph(functions: &[FunctionRecord]) -> CallGraph {
    let mut graph = CallGraph::default();

    for func in functions {
        graph.nodes.insert(func.name.clone());
        let calls = graph.adjacency.entry(func.name.clone()).or_default();
        calls.extend(func.calls.iter().cloned());
    }

    for func in functions {
        for called in &func.calls {
            graph.add_edge(&func.name, called);
        }
    }

    tracing::debug!(
        "Call graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
