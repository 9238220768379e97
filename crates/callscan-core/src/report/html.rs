//! Static HTML rendering of a persisted analysis result.

use std::fmt::Write as _;
use std::path::Path;

use html_escape::encode_text;
use indexmap::IndexMap;
use tracing::info;

use crate::errors::CallscanResult;
use crate::report::assemble::{
    AnalysisResults, GraphNode, COLOR_ERROR, COLOR_INFO, COLOR_WARNING,
};

const TEMPLATE: &str = include_str!("templates/report.html");
const TITLE_EXCERPT_CHARS: usize = 200;
const MAX_CALLS_SHOWN: usize = 10;
const MAX_ISSUES_SHOWN: usize = 20;

fn color_class(color: &str) -> &'static str {
    match color {
        COLOR_ERROR => "error",
        COLOR_WARNING => "warning",
        COLOR_INFO => "info",
        _ => "",
    }
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn render_summary(results: &AnalysisResults) -> String {
    let stats = &results.stats;
    let cards = [
        (stats.total_files, "Files", ""),
        (stats.total_functions, "Functions", ""),
        (stats.total_classes, "Classes", ""),
        (stats.errors, "Errors", " error"),
        (stats.warnings, "Warnings", " warning"),
    ];
    let mut out = String::new();
    for (value, label, class) in cards {
        let _ = writeln!(
            out,
            "        <div class=\"stat-card\"><div class=\"stat-value{class}\">{value}</div><div>{label}</div></div>"
        );
    }
    out
}

fn render_functions(results: &AnalysisResults) -> String {
    let nodes_by_id: IndexMap<&str, &GraphNode> = results
        .graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n))
        .collect();

    let mut calls_by_caller: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for edge in &results.graph.edges {
        calls_by_caller
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
    }

    let mut out = String::new();
    for node in &results.graph.nodes {
        let _ = writeln!(
            out,
            "        <div class=\"function-node {}\">",
            color_class(&node.color)
        );
        let _ = writeln!(
            out,
            "            <div class=\"function-name\">{}</div>",
            encode_text(&node.label)
        );
        let _ = writeln!(
            out,
            "            <div class=\"function-file\">{}:{}</div>",
            encode_text(&node.data.file),
            node.data.line
        );
        if !node.title.is_empty() {
            let _ = writeln!(out, "            <div>{}</div>", encode_text(&excerpt(&node.title)));
        }

        if let Some(calls) = calls_by_caller.get(node.id.as_str()) {
            out.push_str("            <div class=\"function-calls\"><strong>Calls:</strong><br>\n");
            for call_id in calls.iter().take(MAX_CALLS_SHOWN) {
                if let Some(called) = nodes_by_id.get(call_id) {
                    let _ = writeln!(
                        out,
                        "                <div><span class=\"call-arrow\">&rarr;</span>{} ({})</div>",
                        encode_text(&called.label),
                        encode_text(&called.data.file)
                    );
                }
            }
            if calls.len() > MAX_CALLS_SHOWN {
                let _ = writeln!(
                    out,
                    "                <div>... and {} more</div>",
                    calls.len() - MAX_CALLS_SHOWN
                );
            }
            out.push_str("            </div>\n");
        }
        out.push_str("        </div>\n");
    }
    out
}

fn render_issues(results: &AnalysisResults) -> String {
    let mut out = String::new();
    for (category, issues) in results.issues.categories() {
        if issues.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "        <h3>{} ({})</h3>",
            category.to_uppercase(),
            issues.len()
        );
        for issue in issues.iter().take(MAX_ISSUES_SHOWN) {
            let kind = issue.kind.as_str().replace('_', " ").to_uppercase();
            let _ = writeln!(
                out,
                "        <div class=\"issue {}\"><strong>{}</strong><br>{}<br><small>{}:{}</small></div>",
                issue.severity,
                kind,
                encode_text(&issue.message),
                encode_text(&issue.file),
                issue.line
            );
        }
    }
    out
}

/// Render the whole report page.
pub fn render_html(results: &AnalysisResults) -> String {
    TEMPLATE
        .replace("{{SUMMARY}}", render_summary(results).trim_end())
        .replace("{{EDGE_COUNT}}", &results.graph.edges.len().to_string())
        .replace("{{FUNCTIONS}}", render_functions(results).trim_end())
        .replace("{{ISSUES}}", render_issues(results).trim_end())
}

pub fn write_html_report(results: &AnalysisResults, output: &Path) -> CallscanResult<()> {
    std::fs::write(output, render_html(results))?;
    info!("HTML report generated: {}", output.display());
    Ok(())
}
