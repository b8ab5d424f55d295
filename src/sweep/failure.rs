//! Per-pair failure accounting
//!
//! Fatal failures are counted per (keyword, provider) pair in an explicit
//! tracker owned by the orchestrator, never in adapter state. A pair that
//! keeps failing is force-completed once it reaches the configured bound so
//! the sweep cannot livelock on it.

use std::collections::HashMap;

/// Counts fatal failures per (keyword, provider) pair
#[derive(Debug, Default)]
pub struct FailureTracker {
    counts: HashMap<(String, String), u32>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one fatal failure and returns the new count for the pair
    pub fn record(&mut self, keyword: &str, provider: &str) -> u32 {
        let count = self
            .counts
            .entry((keyword.to_string(), provider.to_string()))
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Current count for the pair
    pub fn count(&self, keyword: &str, provider: &str) -> u32 {
        self.counts
            .get(&(keyword.to_string(), provider.to_string()))
            .copied()
            .unwrap_or(0)
    }
}
