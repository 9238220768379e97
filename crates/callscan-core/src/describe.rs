//! Natural-language function descriptions from a chat-completions service.
//!
//! Service failures never fail a run. Every function of an affected batch
//! gets a fallback description naming the failure class instead.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::DescriberConfig;
use crate::models::FunctionRecord;

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// Failure classes of one completion request.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request timed out")]
    Timeout,
    #[error("service returned status {0}: {1}")]
    Status(u16, String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response shape: {0}")]
    Payload(String),
}

/// Sends one prompt and returns the model's text reply.
pub trait DescriptionBackend: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct HttpBackend {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl HttpBackend {
    pub fn new(config: &DescriberConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            agent,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

fn is_timeout(err: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            );
        }
        source = cause.source();
    }
    false
}

impl DescriptionBackend for HttpBackend {
    fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        info!("Making API call to {}", self.endpoint);
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .set("HTTP-Referer", "http://localhost:8000")
            .send_json(body);

        let response = match response {
            Ok(r) => r,
            Err(ureq::Error::Status(code, r)) => {
                let text = r.into_string().unwrap_or_default();
                return Err(BackendError::Status(code, text));
            }
            Err(ureq::Error::Transport(t)) if is_timeout(&t) => return Err(BackendError::Timeout),
            Err(ureq::Error::Transport(t)) => return Err(BackendError::Transport(t.to_string())),
        };

        info!("Response status: {}", response.status());
        let payload: Value = response.into_json().map_err(|e| {
            if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                BackendError::Timeout
            } else {
                BackendError::Payload(e.to_string())
            }
        })?;

        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BackendError::Payload("missing choices[0].message.content".into()))
    }
}

// ---------------------------------------------------------------------------
// Prompt and reply handling
// ---------------------------------------------------------------------------

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n(.*?)\n?\s*```\s*$").expect("valid fence regex")
});

const PROMPT_HEADER: &str = "You are a code analyzer. Describe each function below in detail.

For each function, explain:
1. What it does (its main purpose)
2. How it does it (logic and steps)
3. What data it takes and returns
4. Which other functions or modules it uses

Answer with a JSON array:
[
  {
    \"name\": \"function_name\",
    \"description\": \"Detailed description...\"
  }
]

Functions to analyze:
";

pub fn build_prompt(functions: &[FunctionRecord]) -> String {
    let mut prompt = String::from(PROMPT_HEADER);
    for (i, func) in functions.iter().enumerate() {
        let _ = write!(prompt, "\n\n--- Function {} ---\n", i + 1);
        let _ = writeln!(prompt, "Name: {}", func.name);
        let _ = writeln!(prompt, "File: {}", func.file);
        let _ = writeln!(prompt, "Parameters: {:?}", func.params);
        if let Some(doc) = func.docstring.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(prompt, "Docstring: {doc}");
        }
        let _ = writeln!(prompt, "Code:\n```python\n{}\n```", func.code);
    }
    prompt
}

/// Strip one surrounding fenced code block, if present.
pub fn strip_code_fence(text: &str) -> &str {
    match FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

#[derive(Deserialize)]
struct DescriptionEntry {
    name: String,
    description: String,
}

/// Map of name to description, or `None` when the reply is not a JSON array
/// of `{name, description}` objects.
pub fn parse_descriptions(reply: &str) -> Option<HashMap<String, String>> {
    let entries: Vec<DescriptionEntry> = serde_json::from_str(strip_code_fence(reply)).ok()?;
    Some(
        entries
            .into_iter()
            .map(|e| (e.name, e.description))
            .collect(),
    )
}

fn fallback_suffix(err: &BackendError) -> &'static str {
    match err {
        BackendError::Timeout => "(timeout)",
        BackendError::Status(..) => "(API error)",
        BackendError::Transport(_) | BackendError::Payload(_) => "(error)",
    }
}

fn mask_key(key: &str) -> String {
    let tail = key.len().checked_sub(4).and_then(|i| key.get(i..));
    match (key.get(..20), tail) {
        (Some(head), Some(tail)) if key.len() > 24 => format!("{head}...{tail}"),
        _ => "<unset>".to_string(),
    }
}

// ---------------------------------------------------------------------------
// FunctionDescriber
// ---------------------------------------------------------------------------

pub struct FunctionDescriber {
    backend: Box<dyn DescriptionBackend>,
    config: DescriberConfig,
}

impl FunctionDescriber {
    /// Describer talking to the configured HTTP service.
    pub fn new(config: DescriberConfig) -> Self {
        let backend = Box::new(HttpBackend::new(&config));
        Self { backend, config }
    }

    pub fn with_backend(config: DescriberConfig, backend: Box<dyn DescriptionBackend>) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &DescriberConfig {
        &self.config
    }

    /// Fill `description` for every function of one batch.
    pub fn describe_batch(&self, functions: &mut [FunctionRecord]) {
        let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
        info!("Sending batch of {} functions to {}", functions.len(), self.config.model);
        info!("Functions: {names:?}");

        let prompt = build_prompt(functions);
        info!("Prompt length: {} chars", prompt.len());
        debug!("API key: {}", mask_key(&self.config.api_key));

        let reply = match self.backend.complete(&prompt) {
            Ok(r) => r,
            Err(e) => {
                error!("Description request failed: {e}");
                let suffix = fallback_suffix(&e);
                for func in functions.iter_mut() {
                    func.description = Some(format!("Function {} {suffix}", func.name));
                }
                return;
            }
        };
        info!("Response length: {} chars", reply.len());

        match parse_descriptions(&reply) {
            Some(by_name) => {
                for func in functions.iter_mut() {
                    let text = by_name.get(&func.name).cloned().unwrap_or_else(|| {
                        format!("Function {} (no description provided)", func.name)
                    });
                    func.description = Some(text);
                }
            }
            None => {
                warn!("Reply was not a JSON description array");
                for func in functions.iter_mut() {
                    func.description = Some(format!("Function {} - parsing failed", func.name));
                }
            }
        }
    }

    /// Describe all functions in sequential batches, pausing between batches.
    /// `progress` receives a message and a percentage in 60..90.
    pub fn describe_all(
        &self,
        functions: &mut [FunctionRecord],
        progress: &mut dyn FnMut(&str, f64),
    ) {
        let total = functions.len();
        let batch_size = self.config.batch_size.max(1);
        let num_batches = total.div_ceil(batch_size);
        info!("Processing {total} functions in {num_batches} batches of {batch_size}");

        for (batch_num, batch) in functions.chunks_mut(batch_size).enumerate() {
            let start = batch_num * batch_size;
            let end = start + batch.len();
            info!("Batch {}/{}", batch_num + 1, num_batches);
            progress(
                &format!("Describing functions {}-{}...", start + 1, end),
                60.0 + (start as f64 / total as f64) * 30.0,
            );

            self.describe_batch(batch);

            if end < total && !self.config.batch_delay.is_zero() {
                std::thread::sleep(self.config.batch_delay);
            }
        }
        info!("All batches complete, {total} functions described");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
