//! Background analysis runs keyed by a generated id.
//!
//! Each run executes on its own thread and writes progress into the shared
//! [`RunStore`]; callers poll the store. Runs cannot be cancelled.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{AnalysisConfig, DescriberConfig};
use crate::describe::FunctionDescriber;
use crate::errors::{CallscanError, CallscanResult};
use crate::report::AnalysisResults;
use crate::runner::orchestrator::ProjectAnalyzer;
use crate::runner::progress::{ProgressReport, RunStatus};
use crate::runner::store::{RunState, RunStore};

/// Builds the describer for one run from that run's config.
pub type DescriberFactory = Arc<dyn Fn(DescriberConfig) -> FunctionDescriber + Send + Sync>;

/// Per-run options. The describer config travels with the request, so
/// selecting a model never touches shared state.
#[derive(Clone, Debug, Default)]
pub struct AnalysisRequest {
    pub describe: bool,
    pub describer: DescriberConfig,
}

/// What the model picker shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelListing {
    pub model: String,
    pub available_models: Vec<String>,
    pub api_key_set: bool,
}

pub struct AnalysisService {
    store: Arc<dyn RunStore>,
    analysis: AnalysisConfig,
    describer_factory: DescriberFactory,
}

impl AnalysisService {
    pub fn new(store: Arc<dyn RunStore>, analysis: AnalysisConfig) -> Self {
        Self {
            store,
            analysis,
            describer_factory: Arc::new(FunctionDescriber::new),
        }
    }

    pub fn with_describer_factory(mut self, factory: DescriberFactory) -> Self {
        self.describer_factory = factory;
        self
    }

    /// Validate `path` and start a background run; returns its id.
    pub fn start_analysis(&self, path: &str, request: AnalysisRequest) -> CallscanResult<String> {
        let root = PathBuf::from(path);
        if !root.exists() {
            return Err(CallscanError::Config(format!("Path does not exist: {path}")));
        }

        let run_id = Uuid::new_v4().to_string();
        self.store.set(&run_id, RunState::default());
        info!("Starting run {run_id} for {path}");

        let store = Arc::clone(&self.store);
        let analyzer = ProjectAnalyzer::new(self.analysis.clone());
        let factory = Arc::clone(&self.describer_factory);
        let id = run_id.clone();

        let spawned = thread::Builder::new()
            .name(format!("callscan-run-{}", &run_id[..8]))
            .spawn(move || execute_run(&id, &root, &analyzer, request, factory, store));

        if let Err(e) = spawned {
            self.store.delete(&run_id);
            return Err(e.into());
        }
        Ok(run_id)
    }

    pub fn poll_progress(&self, run_id: &str) -> CallscanResult<ProgressReport> {
        self.store
            .get(run_id)
            .map(|state| state.progress)
            .ok_or_else(|| CallscanError::RunNotFound(run_id.to_string()))
    }

    pub fn fetch_results(&self, run_id: &str) -> CallscanResult<AnalysisResults> {
        let state = self
            .store
            .get(run_id)
            .ok_or_else(|| CallscanError::RunNotFound(run_id.to_string()))?;
        state.results.ok_or_else(|| {
            CallscanError::NoResults(format!(
                "run {run_id} is {:?}: {}",
                state.progress.status, state.progress.message
            ))
        })
    }

    pub fn list_models(&self, current: &DescriberConfig) -> ModelListing {
        ModelListing {
            model: current.model.clone(),
            available_models: current.available_models.clone(),
            api_key_set: current.has_api_key(),
        }
    }

    /// New request-scoped config using `model`.
    pub fn select_model(&self, current: &DescriberConfig, model: &str) -> CallscanResult<DescriberConfig> {
        let selected = current.with_model(model)?;
        info!("Model changed to: {model}");
        Ok(selected)
    }
}

fn execute_run(
    run_id: &str,
    root: &Path,
    analyzer: &ProjectAnalyzer,
    request: AnalysisRequest,
    factory: DescriberFactory,
    store: Arc<dyn RunStore>,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let describer = request.describe.then(|| factory(request.describer.clone()));
        let mut report = |message: &str, progress: f64| {
            // Completion is written together with the results below.
            if progress < 100.0 {
                store.update_progress(run_id, ProgressReport::at(message, progress));
            }
        };
        analyzer.analyze_project(root, describer.as_ref(), &mut report)
    }));

    match outcome {
        Ok(Ok(results)) => {
            store.set(
                run_id,
                RunState {
                    progress: ProgressReport::at("Analysis complete!", 100.0),
                    results: Some(results),
                },
            );
            info!("Run {run_id} completed");
        }
        Ok(Err(e)) => {
            store.update_progress(run_id, ProgressReport::failed(format!("Error: {e}")));
        }
        Err(_) => {
            error!("Run {run_id} panicked");
            store.update_progress(run_id, ProgressReport::failed("Error: analysis panicked"));
        }
    }
}

/// Block until `run_id` finishes, polling every `interval`.
pub fn wait_for_run(
    service: &AnalysisService,
    run_id: &str,
    interval: std::time::Duration,
) -> CallscanResult<ProgressReport> {
    loop {
        let report = service.poll_progress(run_id)?;
        if report.status != RunStatus::Running {
            return Ok(report);
        }
        thread::sleep(interval);
    }
}
