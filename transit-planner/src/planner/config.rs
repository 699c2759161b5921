//! Search configuration for the route planner.

use std::time::Duration;

/// Configuration parameters for a route search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum number of rounds the round-relaxation engine may run.
    /// Exceeding it fails the search with `SearchBudgetExceeded`.
    pub max_rounds: usize,

    /// Maximum number of queue pops for the best-first engine.
    pub max_iterations: usize,

    /// Maximum number of stops fetched concurrently in one batch.
    /// Higher values increase parallelism against the timetable store.
    pub fetch_batch_size: usize,

    /// Wall-clock limit for one search (seconds). `None` disables it.
    pub timeout_secs: Option<u64>,
}

impl SearchConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(
        max_rounds: usize,
        max_iterations: usize,
        fetch_batch_size: usize,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            max_rounds,
            max_iterations,
            fetch_batch_size,
            timeout_secs,
        }
    }

    /// Returns the timeout as a Duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Batch size, never zero.
    pub(crate) fn batch_size(&self) -> usize {
        self.fetch_batch_size.max(1)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_rounds: 64,
            max_iterations: 1_000_000,
            fetch_batch_size: 16,
            timeout_secs: Some(30),
        }
    }
}
