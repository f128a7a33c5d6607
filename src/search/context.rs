//! Per-search mutable state.
//!
//! One `SearchContext` is created per search call and owned by it exclusively:
//! the result store, counters and budget bookkeeping all live here rather than
//! in the engine, so an engine can be reused (or shared) across searches.

use std::time::{Duration, Instant};

use crate::domain::{SearchConfig, SearchStats};
use crate::search::observer::Budget;
use crate::search::store::ResultStore;

#[derive(Debug)]
pub struct SearchContext {
    pub store: ResultStore,
    pub stats: SearchStats,
    started: Instant,
    deadline: Option<Instant>,
    max_evaluations: Option<usize>,
}

impl SearchContext {
    pub fn new(config: &SearchConfig) -> Self {
        let started = Instant::now();
        Self {
            store: ResultStore::new(config.max_stored_combinations),
            stats: SearchStats::default(),
            started,
            // A budget too large to represent as an instant never expires.
            deadline: config.time_budget.and_then(|b| started.checked_add(b)),
            max_evaluations: config.max_evaluations,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// How many more candidates may be evaluated, or which budget is spent.
    pub fn allowance(&self, wanted: usize) -> Result<usize, Budget> {
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Budget::Time);
        }
        match self.max_evaluations {
            Some(max) if self.stats.evaluated >= max => Err(Budget::Evaluations),
            Some(max) => Ok(wanted.min(max - self.stats.evaluated)),
            None => Ok(wanted),
        }
    }
}
