//! Structured progress events.
//!
//! The engine never prints. It reports what it is doing to a `SearchObserver`;
//! `LogObserver` forwards events to the `log` facade, which is what the binary
//! uses.

use std::time::Duration;

use crate::error::CandidateError;
use crate::search::subset::VariableSubset;

/// Which budget stopped the search early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Evaluations,
    Time,
}

#[derive(Debug, Clone)]
pub enum SearchEvent<'a> {
    LevelStarted {
        size: usize,
        candidates: usize,
    },
    CandidateRejected {
        subset: &'a VariableSubset,
        reason: &'a CandidateError,
    },
    ModelStored {
        subset: &'a VariableSubset,
        std_error: f64,
        evicted: Option<&'a VariableSubset>,
    },
    ModelDiscarded {
        subset: &'a VariableSubset,
        std_error: f64,
        worst_std_error: f64,
    },
    LevelFinished {
        size: usize,
        retained: usize,
    },
    BudgetExhausted {
        budget: Budget,
        evaluated: usize,
    },
    Finished {
        models: usize,
        elapsed: Duration,
    },
}

pub trait SearchObserver {
    fn on_event(&mut self, event: &SearchEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {
    fn on_event(&mut self, _event: &SearchEvent<'_>) {}
}

/// Forwards events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SearchObserver for LogObserver {
    fn on_event(&mut self, event: &SearchEvent<'_>) {
        match event {
            SearchEvent::LevelStarted { size, candidates } => {
                log::info!("size {size}: evaluating {candidates} combinations");
            }
            SearchEvent::CandidateRejected { subset, reason } => {
                log::debug!("rejected {subset}: {reason}");
            }
            SearchEvent::ModelStored {
                subset,
                std_error,
                evicted: Some(evicted),
            } => {
                log::debug!(
                    "stored {subset} (se={std_error:.6}), evicting {evicted} ({} shared)",
                    subset.overlap(evicted)
                );
            }
            SearchEvent::ModelStored {
                subset,
                std_error,
                evicted: None,
            } => {
                log::debug!("stored {subset} (se={std_error:.6})");
            }
            SearchEvent::ModelDiscarded {
                subset,
                std_error,
                worst_std_error,
            } => {
                log::trace!("discarded {subset}: se={std_error:.6} not below worst stored {worst_std_error:.6}");
            }
            SearchEvent::LevelFinished { size, retained } => {
                log::info!("size {size}: {retained} models retained");
            }
            SearchEvent::BudgetExhausted { budget, evaluated } => {
                log::warn!("{budget:?} budget exhausted after {evaluated} evaluations; ranking partial results");
            }
            SearchEvent::Finished { models, elapsed } => {
                log::info!("search finished: {models} models in {:.3}s", elapsed.as_secs_f64());
            }
        }
    }
}
