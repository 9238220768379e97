//! Extraction pipeline orchestration with Rayon-based parallelism.
//!
//! A file that cannot be read, is too large, is not valid UTF-8, or does not
//! parse is skipped and recorded as a [`FileFailure`]; it never aborts the
//! scan.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::AnalysisConfig;
use crate::indexer::filesystem::{
    compute_content_hash, detect_language, iter_project_files, relative_path,
};
use crate::indexer::symbols::extract_symbols;
use crate::models::{FailureStage, FileFailure, ParsedProject, Record, SourceFile};

/// Outcome of extracting one file.
pub struct ExtractionResult {
    file: Option<SourceFile>,
    records: Vec<Record>,
    failure: Option<FileFailure>,
}

impl ExtractionResult {
    fn failed(path: &str, stage: FailureStage, message: String) -> Self {
        Self {
            file: None,
            records: vec![],
            failure: Some(FileFailure {
                path: path.to_string(),
                stage,
                message,
            }),
        }
    }
}

fn extract_file_worker(root: &Path, absolute: &Path, config: &AnalysisConfig) -> ExtractionResult {
    let rel_path = relative_path(root, absolute);
    debug!("Parsing file: {rel_path}");

    let bytes = match std::fs::read(absolute) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read {rel_path}: {e}");
            return ExtractionResult::failed(&rel_path, FailureStage::Read, e.to_string());
        }
    };

    let source = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            error!("Encoding error in {rel_path}: {e}");
            return ExtractionResult::failed(&rel_path, FailureStage::Decode, e.to_string());
        }
    };

    let size_bytes = source.len() as u64;
    if size_bytes > config.max_file_size {
        warn!("File too large, skipping: {rel_path} ({size_bytes} bytes)");
        return ExtractionResult::failed(
            &rel_path,
            FailureStage::TooLarge,
            format!(
                "{size_bytes} bytes exceeds limit of {}",
                config.max_file_size
            ),
        );
    }

    let language = detect_language(&rel_path).unwrap_or_else(|| "unknown".to_string());
    let records = match extract_symbols(&source, &rel_path, &language) {
        Ok(r) => r,
        Err(e) => {
            error!("Syntax error in {rel_path}: {e}");
            return ExtractionResult::failed(&rel_path, FailureStage::Parse, e.to_string());
        }
    };

    ExtractionResult {
        file: Some(SourceFile {
            path: rel_path,
            language,
            size_bytes,
            content_hash: compute_content_hash(source.as_bytes()),
        }),
        records,
        failure: None,
    }
}

/// Extract every file, in parallel when `workers > 1`. Results keep the
/// input order.
pub fn parallel_extract(
    root: &Path,
    files: &[std::path::PathBuf],
    config: &AnalysisConfig,
) -> Vec<ExtractionResult> {
    if files.is_empty() {
        return vec![];
    }

    if config.workers <= 1 {
        return files
            .iter()
            .map(|f| extract_file_worker(root, f, config))
            .collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build();

    match pool {
        Ok(pool) => pool.install(|| {
            files
                .par_iter()
                .map(|f| extract_file_worker(root, f, config))
                .collect()
        }),
        Err(e) => {
            warn!("Falling back to sequential extraction: {e}");
            files
                .iter()
                .map(|f| extract_file_worker(root, f, config))
                .collect()
        }
    }
}

/// Scan `root` and build the read-only project model.
pub fn parse_project(root: &Path, config: &AnalysisConfig) -> ParsedProject {
    let started = Instant::now();
    info!("Scanning project: {}", root.display());
    info!("Supported extensions: {:?}", config.extensions);
    info!("Ignored directories: {:?}", config.ignore_dirs);

    let paths = iter_project_files(root, config);
    let mut project = ParsedProject::default();

    for result in parallel_extract(root, &paths, config) {
        if let Some(file) = result.file {
            project.files.push(file);
        }
        if let Some(failure) = result.failure {
            project.failures.push(failure);
        }
        project.absorb(result.records);
    }

    info!(
        "Parsed {} files ({} skipped) in {} ms",
        project.files_scanned(),
        project.failures.len(),
        started.elapsed().as_millis()
    );
    info!("Total functions: {}", project.functions.len());
    info!("Total classes: {}", project.classes.len());
    info!("Total imports: {}", project.imports.len());

    project
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_parse_project_collects_records() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.py", b"import os\n\ndef a():\n    b()\n");
        write(root, "pkg/b.py", b"class K:\n    def b(self):\n        pass\n");
        write(root, "web/app.ts", b"export function f() {}\n");

        let project = parse_project(root, &AnalysisConfig::default());
        assert_eq!(project.files_scanned(), 3);
        assert!(project.failures.is_empty());
        let names: Vec<&str> = project.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(project.classes.len(), 1);
        assert_eq!(project.imports.len(), 1);
        assert_eq!(project.functions[1].file, "pkg/b.py");
    }

    #[test]
    fn test_bad_files_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "good.py", b"def ok():\n    pass\n");
        write(root, "broken.py", b"def nope(:\n");
        write(root, "latin.py", &[0x64, 0x65, 0x66, 0x20, 0xff, 0xfe]);
        write(root, "big.py", "x = 1\n".repeat(100).as_bytes());

        let config = AnalysisConfig {
            max_file_size: 100,
            workers: 1,
            ..Default::default()
        };
        let project = parse_project(root, &config);

        assert_eq!(project.functions.len(), 1);
        assert_eq!(project.functions[0].name, "ok");
        let mut stages: Vec<(String, FailureStage)> = project
            .failures
            .iter()
            .map(|f| (f.path.clone(), f.stage))
            .collect();
        stages.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            stages,
            vec![
                ("big.py".to_string(), FailureStage::TooLarge),
                ("broken.py".to_string(), FailureStage::Parse),
                ("latin.py".to_string(), FailureStage::Decode),
            ]
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for i in 0..12 {
            write(
                root,
                &format!("m{i:02}.py"),
                format!("def f{i}():\n    g{i}()\n").as_bytes(),
            );
        }
        let sequential = parse_project(
            root,
            &AnalysisConfig {
                workers: 1,
                ..Default::default()
            },
        );
        let parallel = parse_project(
            root,
            &AnalysisConfig {
                workers: 4,
                ..Default::default()
            },
        );
        assert_eq!(sequential.functions, parallel.functions);
        assert_eq!(sequential.files, parallel.files);
    }
}
