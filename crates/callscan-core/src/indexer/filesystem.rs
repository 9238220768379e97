//! Filesystem scanning helpers for extraction passes.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::config::AnalysisConfig;

const LANGUAGE_BY_EXTENSION: &[(&str, &str)] = &[
    (".py", "python"),
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
];

/// Only this language is parsed into functions, classes and imports.
pub const PARSED_LANGUAGE: &str = "python";

fn is_ignored_dir(entry: &DirEntry, config: &AnalysisConfig) -> bool {
    // The root itself is never filtered, even if its name is on the list.
    entry.depth() > 0
        && entry.file_type().is_dir()
        && config.is_ignored_dir(&entry.file_name().to_string_lossy())
}

/// Recursively collect eligible files under `root`, skipping ignored
/// directory subtrees. Output is sorted by path within each directory so
/// repeated scans see the same order.
pub fn iter_project_files(root: &Path, config: &AnalysisConfig) -> Vec<PathBuf> {
    let mut result = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e, config));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        // Symlinked files count; symlinked directories are not descended.
        if !entry.path().is_file() {
            continue;
        }
        if config.is_eligible(&entry.file_name().to_string_lossy()) {
            result.push(entry.into_path());
        }
    }
    result
}

/// Root-relative path with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

pub fn detect_language(path: &str) -> Option<String> {
    let path = Path::new(path);
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))?;
    LANGUAGE_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext.as_str())
        .map(|(_, lang)| lang.to_string())
}

pub fn compute_content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x = 1\n").unwrap();
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("a/b.py").as_deref(), Some("python"));
        assert_eq!(detect_language("a/b.TSX").as_deref(), Some("typescript"));
        assert_eq!(detect_language("a/b.jsx").as_deref(), Some("javascript"));
        assert_eq!(detect_language("a/b.rs"), None);
        assert_eq!(detect_language("Makefile"), None);
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        let hash = compute_content_hash(b"hello");
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_iter_project_files_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "main.py");
        touch(root, "pkg/util.py");
        touch(root, "pkg/readme.md");
        touch(root, "node_modules/lib/index.js");
        touch(root, "pkg/__pycache__/util.py");
        touch(root, "web/app.ts");

        let files: Vec<String> = iter_project_files(root, &AnalysisConfig::default())
            .iter()
            .map(|p| relative_path(root, p))
            .collect();

        assert_eq!(files, vec!["main.py", "pkg/util.py", "web/app.ts"]);
    }

    #[test]
    fn test_iter_project_files_custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "a.py");
        touch(root, "b.ts");
        let config = AnalysisConfig {
            extensions: vec![".ts".into()],
            ..Default::default()
        };
        let files = iter_project_files(root, &config);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("b.ts"));
    }

    #[cfg(unix)]
    #[test]
    fn test_iter_project_files_includes_symlinked_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "real/impl.py");
        std::os::unix::fs::symlink(root.join("real/impl.py"), root.join("linked.py")).unwrap();
        std::os::unix::fs::symlink(root.join("missing.py"), root.join("dangling.py")).unwrap();

        let files: Vec<String> = iter_project_files(root, &AnalysisConfig::default())
            .iter()
            .map(|p| relative_path(root, p))
            .collect();

        assert_eq!(files, vec!["linked.py", "real/impl.py"]);
    }
}
