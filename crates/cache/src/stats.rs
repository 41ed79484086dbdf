use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome of a bulk load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// JSON files discovered under the root
    pub files_found: usize,

    /// Files parsed and cached
    pub loaded: usize,

    /// Files that could not be read or parsed
    pub failed: usize,

    /// Wall time in milliseconds
    pub elapsed_ms: u64,

    /// `path: reason` for every failed file
    pub failures: Vec<String>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_loaded(&mut self) {
        self.loaded += 1;
    }

    pub fn add_failure(&mut self, path: &str, reason: impl std::fmt::Display) {
        self.failed += 1;
        self.failures.push(format!("{path}: {reason}"));
    }
}

/// Snapshot of cache contents and lookup efficiency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_files: usize,
    pub files_by_type: BTreeMap<String, usize>,
    pub files_by_domain: BTreeMap<String, usize>,
    pub domains: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    /// Fraction of lookups served from memory, in `[0, 1]`.
    pub hit_rate: f64,
    pub total_load_time_ms: u64,
    pub avg_load_time_ms: u64,
}

impl CacheStats {
    pub fn files_of_type(&self, file_type: crate::FileType) -> usize {
        self.files_by_type
            .get(file_type.as_str())
            .copied()
            .unwrap_or(0)
    }
}

/// Lookup counters, kept under their own lock apart from the document map.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StatsCounters {
    pub(crate) hits: u64,
    pub(crate) misses: u64,
    pub(crate) total_load_time: Duration,
}

impl StatsCounters {
    pub(crate) fn fill(&self, stats: &mut CacheStats) {
        let total = self.hits + self.misses;
        let total_ms = u64::try_from(self.total_load_time.as_millis()).unwrap_or(u64::MAX);
        stats.hits = self.hits;
        stats.misses = self.misses;
        stats.total_requests = total;
        stats.total_load_time_ms = total_ms;
        if total > 0 {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.hits as f64 / total as f64;
            stats.hit_rate = rate;
            stats.avg_load_time_ms = total_ms / total;
        } else {
            stats.hit_rate = 0.0;
            stats.avg_load_time_ms = 0;
        }
    }
}
