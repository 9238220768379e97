//! Per-run state storage keyed by run id.
//!
//! [`InMemoryRunStore`] evicts entries older than the configured TTL and,
//! past `max_entries`, the least recently written ones.

use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::RunStoreConfig;
use crate::report::AnalysisResults;
use crate::runner::progress::ProgressReport;

/// Everything known about one run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunState {
    pub progress: ProgressReport,
    pub results: Option<AnalysisResults>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            progress: ProgressReport::starting(),
            results: None,
        }
    }
}

pub trait RunStore: Send + Sync {
    fn get(&self, run_id: &str) -> Option<RunState>;
    fn set(&self, run_id: &str, state: RunState);
    /// Returns whether an entry was removed.
    fn delete(&self, run_id: &str) -> bool;

    fn update_progress(&self, run_id: &str, progress: ProgressReport) {
        let mut state = self.get(run_id).unwrap_or_default();
        state.progress = progress;
        self.set(run_id, state);
    }
}

struct StoreEntry {
    state: RunState,
    written_at: Instant,
}

pub struct InMemoryRunStore {
    config: RunStoreConfig,
    entries: Mutex<IndexMap<String, StoreEntry>>,
}

impl InMemoryRunStore {
    pub fn new(config: RunStoreConfig) -> Self {
        Self {
            config: RunStoreConfig {
                max_entries: config.max_entries.max(1),
                ..config
            },
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&self, entries: &mut IndexMap<String, StoreEntry>) {
        let now = Instant::now();
        let ttl = self.config.ttl;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.written_at) < ttl);
        if entries.len() < before {
            debug!("Evicted {} expired runs", before - entries.len());
        }
    }

    fn evict_over_capacity(&self, entries: &mut IndexMap<String, StoreEntry>) {
        while entries.len() > self.config.max_entries {
            entries.shift_remove_index(0);
        }
    }
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new(RunStoreConfig::default())
    }
}

impl RunStore for InMemoryRunStore {
    fn get(&self, run_id: &str) -> Option<RunState> {
        let mut entries = self.entries.lock();
        self.evict_expired(&mut entries);
        entries.get(run_id).map(|e| e.state.clone())
    }

    fn set(&self, run_id: &str, state: RunState) {
        let mut entries = self.entries.lock();
        self.evict_expired(&mut entries);
        // Re-inserting moves the run to the back of the eviction order.
        entries.shift_remove(run_id);
        entries.insert(
            run_id.to_string(),
            StoreEntry {
                state,
                written_at: Instant::now(),
            },
        );
        self.evict_over_capacity(&mut entries);
    }

    fn delete(&self, run_id: &str) -> bool {
        self.entries.lock().shift_remove(run_id).is_some()
    }
}
