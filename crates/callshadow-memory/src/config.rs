//! Window and registry tuning knobs

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for memory windows and session expiry. Loaded by the outer
/// config layer and passed in at construction; the core never reads the
/// environment itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Hard upper bound on live turns per window.
    pub capacity: usize,

    /// Fill level that triggers a compaction attempt.
    pub soft_threshold: usize,

    /// How many of the oldest turns one compaction summarizes.
    pub compaction_batch: usize,

    /// Character budget handed to the summarizer.
    pub summary_max_chars: usize,

    /// Deadline for one summarizer call.
    pub summarizer_timeout_ms: u64,

    /// Sessions idle longer than this are swept.
    pub idle_timeout_secs: u64,

    /// How often the gateway sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            soft_threshold: 40,
            compaction_batch: 12,
            summary_max_chars: 600,
            summarizer_timeout_ms: 10_000,
            idle_timeout_secs: 1800,
            sweep_interval_secs: 60,
        }
    }
}

impl MemoryConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_soft_threshold(mut self, soft_threshold: usize) -> Self {
        self.soft_threshold = soft_threshold;
        self
    }

    pub fn with_compaction_batch(mut self, compaction_batch: usize) -> Self {
        self.compaction_batch = compaction_batch;
        self
    }

    pub fn with_summarizer_timeout(mut self, timeout: Duration) -> Self {
        self.summarizer_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn summarizer_timeout(&self) -> Duration {
        Duration::from_millis(self.summarizer_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Clamp degenerate values so the window invariants hold for any input.
    pub fn normalized(mut self) -> Self {
        self.capacity = self.capacity.max(1);
        self.soft_threshold = self.soft_threshold.clamp(1, self.capacity);
        self.compaction_batch = self.compaction_batch.max(1);
        self
    }
}
