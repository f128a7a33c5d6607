//! Size-by-size combination search.
//!
//! The engine is a small state machine:
//!
//! ```text
//! Generate(1) -> Evaluate(1) -> StopCheck(1) -> Generate(2) -> ... -> Rank -> Done
//! ```
//!
//! - size 1 tries every variable on its own (plain OLS)
//! - size n > 1 extends the (n-1)-prefix of every stored combination by one
//!   unused variable (principal-component regression)
//! - a level that leaves nothing of its size in the store ends the search
//!
//! The prefix extension is greedy: once a combination is evicted from the
//! store, its supersets are never tried.
//!
//! Candidates of a level are evaluated in chunks, in parallel when enabled.
//! Results are applied to the store on this thread in candidate order, so the
//! outcome does not depend on scheduling.

use std::collections::HashSet;

use rayon::prelude::*;

use crate::domain::{CandidateModel, RankedModel, Sample, SearchConfig, SearchOutcome};
use crate::error::{CandidateError, SearchError};
use crate::search::context::SearchContext;
use crate::search::evaluate::Evaluator;
use crate::search::observer::{LogObserver, SearchEvent, SearchObserver};
use crate::search::store::{InsertOutcome, ResultStore};
use crate::search::subset::VariableSubset;
use crate::stats::{ApproxStudentT, StatisticalTables};

/// Candidates evaluated between two budget checks.
const CHUNK: usize = 64;

static DEFAULT_TABLES: ApproxStudentT = ApproxStudentT;

enum State {
    Generate(usize),
    Evaluate(usize, Vec<VariableSubset>),
    StopCheck(usize),
    Rank,
    Done(Vec<RankedModel>),
}

pub struct SearchEngine<'a> {
    config: SearchConfig,
    tables: &'a (dyn StatisticalTables + Sync),
}

impl SearchEngine<'static> {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            tables: &DEFAULT_TABLES,
        }
    }
}

impl<'a> SearchEngine<'a> {
    /// Use caller-supplied critical values instead of the built-in approximation.
    pub fn with_tables<'b>(self, tables: &'b (dyn StatisticalTables + Sync)) -> SearchEngine<'b> {
        SearchEngine {
            config: self.config,
            tables,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn run(&self, sample: &Sample, observer: &mut dyn SearchObserver) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;

        let p = sample.n_vars();
        let max_size = self.config.max_combination_size.map_or(p, |m| m.min(p));
        let evaluator = Evaluator {
            sample,
            config: &self.config,
            tables: self.tables,
        };
        let mut ctx = SearchContext::new(&self.config);

        let mut state = State::Generate(1);
        let ranked = loop {
            state = match state {
                State::Generate(size) => {
                    let candidates = generate_candidates(&ctx.store, size, p);
                    ctx.stats.generated += candidates.len();
                    observer.on_event(&SearchEvent::LevelStarted {
                        size,
                        candidates: candidates.len(),
                    });
                    State::Evaluate(size, candidates)
                }
                State::Evaluate(size, candidates) => {
                    let before = ctx.stats.evaluated;
                    self.evaluate_level(&evaluator, &mut ctx, &candidates, observer);
                    if ctx.stats.evaluated > before {
                        ctx.stats.deepest_size = size;
                    }
                    if ctx.stats.truncated {
                        State::Rank
                    } else {
                        State::StopCheck(size)
                    }
                }
                State::StopCheck(size) => {
                    let retained = ctx.store.count_size(size);
                    observer.on_event(&SearchEvent::LevelFinished { size, retained });
                    if retained == 0 || size >= max_size {
                        State::Rank
                    } else {
                        State::Generate(size + 1)
                    }
                }
                State::Rank => {
                    let store = std::mem::replace(&mut ctx.store, ResultStore::new(0));
                    State::Done(store.into_ranked())
                }
                State::Done(ranked) => break ranked,
            };
        };

        let elapsed = ctx.elapsed();
        ctx.stats.elapsed_ms = elapsed.as_millis();
        observer.on_event(&SearchEvent::Finished {
            models: ranked.len(),
            elapsed,
        });

        if ranked.is_empty() {
            return Err(SearchError::NoModelFound);
        }
        Ok(SearchOutcome {
            models: ranked,
            stats: ctx.stats,
        })
    }

    fn evaluate_level(
        &self,
        evaluator: &Evaluator<'_>,
        ctx: &mut SearchContext,
        candidates: &[VariableSubset],
        observer: &mut dyn SearchObserver,
    ) {
        let mut start = 0;
        while start < candidates.len() {
            let wanted = (candidates.len() - start).min(CHUNK);
            let take = match ctx.allowance(wanted) {
                Ok(n) => n,
                Err(budget) => {
                    ctx.stats.truncated = true;
                    observer.on_event(&SearchEvent::BudgetExhausted {
                        budget,
                        evaluated: ctx.stats.evaluated,
                    });
                    return;
                }
            };
            let chunk = &candidates[start..start + take];
            let results: Vec<Result<CandidateModel, CandidateError>> = if self.config.parallel {
                chunk.par_iter().map(|s| evaluator.evaluate(s)).collect()
            } else {
                chunk.iter().map(|s| evaluator.evaluate(s)).collect()
            };
            ctx.stats.evaluated += take;

            for (subset, result) in chunk.iter().zip(results) {
                record(ctx, subset, result, observer);
            }
            start += take;
        }
    }
}

/// Run a search with the default tables, logging progress through `log`.
pub fn search(sample: &Sample, config: SearchConfig) -> Result<SearchOutcome, SearchError> {
    SearchEngine::new(config).run(sample, &mut LogObserver)
}

fn record(
    ctx: &mut SearchContext,
    subset: &VariableSubset,
    result: Result<CandidateModel, CandidateError>,
    observer: &mut dyn SearchObserver,
) {
    let model = match result {
        Ok(model) => model,
        Err(reason) => {
            match reason {
                CandidateError::Numerical(_) => ctx.stats.rejected_numerical += 1,
                CandidateError::InsufficientData { .. } => ctx.stats.rejected_insufficient += 1,
                CandidateError::NotSignificant { .. } => ctx.stats.rejected_insignificant += 1,
                CandidateError::SignMismatch { .. } => ctx.stats.rejected_sign += 1,
            }
            observer.on_event(&SearchEvent::CandidateRejected {
                subset,
                reason: &reason,
            });
            return;
        }
    };

    let std_error = model.std_error;
    match ctx.store.insert(subset.clone(), model) {
        InsertOutcome::Appended => {
            ctx.stats.stored += 1;
            observer.on_event(&SearchEvent::ModelStored {
                subset,
                std_error,
                evicted: None,
            });
        }
        InsertOutcome::Replaced { evicted, .. } => {
            ctx.stats.stored += 1;
            ctx.stats.replaced += 1;
            observer.on_event(&SearchEvent::ModelStored {
                subset,
                std_error,
                evicted: Some(&evicted),
            });
        }
        InsertOutcome::Rejected { worst_std_error } => {
            ctx.stats.discarded += 1;
            observer.on_event(&SearchEvent::ModelDiscarded {
                subset,
                std_error,
                worst_std_error,
            });
        }
    }
}

/// Candidate combinations of `size` variables, in a deterministic order.
pub fn generate_candidates(store: &ResultStore, size: usize, universe: usize) -> Vec<VariableSubset> {
    if size == 1 {
        return (0..universe).map(|v| VariableSubset::single(universe, v)).collect();
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in store.entries() {
        if entry.subset.len() < size - 1 {
            continue;
        }
        let prefix = entry.subset.prefix(size - 1);
        for v in 0..universe {
            if prefix.contains(v) {
                continue;
            }
            let candidate = prefix.with(v);
            if seen.insert(candidate.clone()) {
                out.push(candidate);
            }
        }
    }
    out
}
