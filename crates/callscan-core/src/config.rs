//! Analysis and description-service configuration.
//!
//! Every value here is request-scoped: callers build a config, pass it down,
//! and derive a new one to change it. Nothing is held in process-wide state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{CallscanError, CallscanResult};

pub const DEFAULT_EXTENSIONS: &[&str] = &[".py", ".js", ".ts", ".jsx", ".tsx"];

pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    "venv",
    "env",
    ".venv",
];

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub const DEFAULT_MODEL: &str = "minimax/minimax-m2";

pub const AVAILABLE_MODELS: &[&str] = &[
    "anthropic/claude-3-5-haiku-20241022",
    "openai/gpt-4o-mini",
    "deepseek/deepseek-chat",
    "qwen/qwen-2.5-coder-32b-instruct",
    "google/gemini-flash-1.5",
    "minimax/minimax-m2",
];

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Controls which files are scanned and how extraction runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Eligible file extensions, with leading dot.
    pub extensions: Vec<String>,
    /// Directory names never descended into.
    pub ignore_dirs: Vec<String>,
    /// Files whose encoded size exceeds this are skipped.
    pub max_file_size: u64,
    /// Worker threads for extraction; 1 means sequential.
    pub workers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            workers: 4,
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by `CALLSCAN_MAX_FILE_SIZE` / `CALLSCAN_WORKERS`.
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = env_parse::<u64>("CALLSCAN_MAX_FILE_SIZE") {
            config.max_file_size = size;
        }
        if let Some(workers) = env_parse::<usize>("CALLSCAN_WORKERS") {
            config.workers = workers.max(1);
        }
        config
    }

    pub fn is_eligible(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }

    pub fn is_ignored_dir(&self, dir_name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == dir_name)
    }
}

// ---------------------------------------------------------------------------
// DescriberConfig
// ---------------------------------------------------------------------------

/// Settings for the external description service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriberConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub available_models: Vec<String>,
    pub batch_size: usize,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    #[serde(with = "duration_secs")]
    pub batch_delay: Duration,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for DescriberConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            available_models: AVAILABLE_MODELS.iter().map(|s| s.to_string()).collect(),
            batch_size: 10,
            timeout: Duration::from_secs(60),
            batch_delay: Duration::from_secs(1),
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

impl DescriberConfig {
    /// Defaults overridden by `OPENROUTER_API_KEY` and `LLM_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(key) = env_string("OPENROUTER_API_KEY") {
            config.api_key = key;
        }
        if let Some(model) = env_string("LLM_MODEL") {
            config.model = model;
        }
        config
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Return a copy using `model`, which must be one of `available_models`.
    pub fn with_model(&self, model: &str) -> CallscanResult<Self> {
        if !self.available_models.iter().any(|m| m == model) {
            return Err(CallscanError::Config(format!("Invalid model: {model}")));
        }
        Ok(Self {
            model: model.to_string(),
            ..self.clone()
        })
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

// ---------------------------------------------------------------------------
// RunStoreConfig
// ---------------------------------------------------------------------------

/// Retention policy for finished and in-flight runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunStoreConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for RunStoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_entries: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extensions_eligible() {
        let config = AnalysisConfig::default();
        assert!(config.is_eligible("main.py"));
        assert!(config.is_eligible("app.tsx"));
        assert!(!config.is_eligible("README.md"));
        assert!(!config.is_eligible("main.pyc"));
    }

    #[test]
    fn test_ignored_dirs() {
        let config = AnalysisConfig::default();
        assert!(config.is_ignored_dir("node_modules"));
        assert!(config.is_ignored_dir(".venv"));
        assert!(!config.is_ignored_dir("src"));
    }

    #[test]
    fn test_with_model_accepts_known() {
        let config = DescriberConfig::default();
        let switched = config.with_model("openai/gpt-4o-mini").unwrap();
        assert_eq!(switched.model, "openai/gpt-4o-mini");
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_with_model_rejects_unknown() {
        let config = DescriberConfig::default();
        assert!(config.with_model("nope/unknown").is_err());
    }

    #[test]
    fn test_describer_config_roundtrip_skips_key() {
        let config = DescriberConfig {
            api_key: "secret".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        let back: DescriberConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timeout, config.timeout);
        assert!(back.api_key.is_empty());
    }
}
