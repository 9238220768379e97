//! End-to-end analysis of one project: scan, graph, issues, descriptions,
//! assembly.

use std::path::Path;

use tracing::{error, info};

use crate::analysis::analyze;
use crate::config::AnalysisConfig;
use crate::describe::FunctionDescriber;
use crate::errors::{CallscanError, CallscanResult};
use crate::indexer::callgraph::build_call_graph;
use crate::indexer::pipeline::parse_project;
use crate::models::Severity;
use crate::report::{assemble, AnalysisResults};
use crate::runner::progress::FAILED_PROGRESS;

pub struct ProjectAnalyzer {
    config: AnalysisConfig,
}

impl ProjectAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline. `progress` receives a message and a percentage
    /// at each milestone, and `-1` before a failure is returned.
    pub fn analyze_project(
        &self,
        root: &Path,
        describer: Option<&FunctionDescriber>,
        progress: &mut dyn FnMut(&str, f64),
    ) -> CallscanResult<AnalysisResults> {
        info!("Starting project analysis: {}", root.display());
        match self.run(root, describer, progress) {
            Ok(results) => {
                progress("Analysis complete!", 100.0);
                info!("Analysis complete");
                Ok(results)
            }
            Err(e) => {
                error!("Analysis failed: {e}");
                progress(&format!("Error: {e}"), FAILED_PROGRESS);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        root: &Path,
        describer: Option<&FunctionDescriber>,
        progress: &mut dyn FnMut(&str, f64),
    ) -> CallscanResult<AnalysisResults> {
        if !root.is_dir() {
            return Err(CallscanError::Analysis(format!(
                "Not a directory: {}",
                root.display()
            )));
        }

        progress("Parsing project structure...", 10.0);
        let mut project = parse_project(root, &self.config);
        for failure in &project.failures {
            info!("Skipped {} ({:?}): {}", failure.path, failure.stage, failure.message);
        }

        progress("Building call graph...", 30.0);
        let graph = build_call_graph(&project.functions);
        info!("Call graph edges: {}", graph.edge_count());

        progress("Analyzing code issues...", 40.0);
        let issues = analyze(&project, &graph);
        let count = |s: Severity| issues.iter().filter(|i| i.severity == s).count();
        info!(
            "Issues: {} errors, {} warnings, {} info",
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info)
        );

        if let Some(describer) = describer {
            progress("Generating function descriptions...", 60.0);
            info!(
                "Describing {} functions with {}",
                project.functions.len(),
                describer.config().model
            );
            describer.describe_all(&mut project.functions, progress);
        }

        progress("Preparing visualization...", 90.0);
        let results = assemble(&project, &issues);
        info!(
            "Visualization data: {} nodes, {} edges, {} file tree roots",
            results.graph.nodes.len(),
            results.graph.edges.len(),
            results.file_tree.len()
        );
        Ok(results)
    }
}

impl Default for ProjectAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DescriberConfig;
    use crate::describe::{BackendError, DescriptionBackend};
    use std::fs;
    use std::time::Duration;

    struct EchoBackend;

    impl DescriptionBackend for EchoBackend {
        fn complete(&self, _prompt: &str) -> Result<String, BackendError> {
            Ok(r#"[{"name": "a", "description": "Calls b."}]"#.to_string())
        }
    }

    fn project_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("m.py"), "def a():\n    b()\n\ndef b():\n    return 1\n").unwrap();
        dir
    }

    #[test]
    fn test_milestones_in_order() {
        let dir = project_dir();
        let mut seen = Vec::new();
        let results = ProjectAnalyzer::default()
            .analyze_project(dir.path(), None, &mut |_, p| seen.push(p))
            .unwrap();
        assert_eq!(seen, vec![10.0, 30.0, 40.0, 90.0, 100.0]);
        assert_eq!(results.graph.nodes.len(), 2);
        assert_eq!(results.graph.edges[0].from, "m.py:a");
        assert_eq!(results.graph.edges[0].to, "m.py:b");
        assert_eq!(results.stats.by_kind["dead_code"], 1);
    }

    #[test]
    fn test_descriptions_flow_into_nodes() {
        let dir = project_dir();
        let describer = FunctionDescriber::with_backend(
            DescriberConfig {
                batch_delay: Duration::ZERO,
                ..Default::default()
            },
            Box::new(EchoBackend),
        );
        let mut seen = Vec::new();
        let results = ProjectAnalyzer::default()
            .analyze_project(dir.path(), Some(&describer), &mut |_, p| seen.push(p))
            .unwrap();
        assert!(seen.contains(&60.0));
        assert_eq!(results.graph.nodes[0].title, "Calls b.");
        assert_eq!(
            results.graph.nodes[1].data.description,
            "Function b (no description provided)"
        );
    }

    #[test]
    fn test_missing_root_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut seen = Vec::new();
        let err = ProjectAnalyzer::default()
            .analyze_project(&dir.path().join("absent"), None, &mut |m, p| {
                seen.push((m.to_string(), p))
            })
            .unwrap_err();
        assert!(matches!(err, CallscanError::Analysis(_)));
        let (message, value) = seen.last().unwrap();
        assert!(message.starts_with("Error: "));
        assert_eq!(*value, -1.0);
    }
}
