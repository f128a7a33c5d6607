//! Bounded best-of-K store of accepted models.

use crate::domain::{CandidateModel, RankedModel};
use crate::math::index_sort;
use crate::search::subset::VariableSubset;

#[derive(Debug, Clone)]
pub struct StoredModel {
    pub subset: VariableSubset,
    pub model: CandidateModel,
}

/// What happened to a model offered to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Appended,
    Replaced {
        evicted: VariableSubset,
        evicted_std_error: f64,
    },
    /// The store was full and the model was not strictly better than the worst entry.
    Rejected { worst_std_error: f64 },
}

/// Holds at most `capacity` models. Once full, a new model replaces the entry
/// with the largest standard error, but only if it is strictly better.
#[derive(Debug, Clone)]
pub struct ResultStore {
    capacity: usize,
    entries: Vec<StoredModel>,
}

impl ResultStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Entries in insertion order (replacements take the evicted slot).
    pub fn entries(&self) -> &[StoredModel] {
        &self.entries
    }

    /// Index and standard error of the worst entry; the first one on ties.
    pub fn worst(&self) -> Option<(usize, f64)> {
        let mut worst: Option<(usize, f64)> = None;
        for (i, e) in self.entries.iter().enumerate() {
            let se = e.model.std_error;
            if worst.is_none_or(|(_, w)| se > w) {
                worst = Some((i, se));
            }
        }
        worst
    }

    pub fn insert(&mut self, subset: VariableSubset, model: CandidateModel) -> InsertOutcome {
        if !self.is_full() {
            self.entries.push(StoredModel { subset, model });
            return InsertOutcome::Appended;
        }
        let Some((idx, worst_std_error)) = self.worst() else {
            // Zero capacity.
            return InsertOutcome::Rejected {
                worst_std_error: f64::NAN,
            };
        };
        if model.std_error < worst_std_error {
            let evicted = std::mem::replace(&mut self.entries[idx], StoredModel { subset, model });
            InsertOutcome::Replaced {
                evicted: evicted.subset,
                evicted_std_error: worst_std_error,
            }
        } else {
            InsertOutcome::Rejected { worst_std_error }
        }
    }

    /// Number of stored models built from exactly `size` variables.
    pub fn count_size(&self, size: usize) -> usize {
        self.entries.iter().filter(|e| e.subset.len() == size).count()
    }

    /// Consume the store and order models by ascending standard error.
    pub fn into_ranked(self) -> Vec<RankedModel> {
        let errors: Vec<f64> = self.entries.iter().map(|e| e.model.std_error).collect();
        let order = index_sort(&errors);
        let mut slots: Vec<Option<StoredModel>> = self.entries.into_iter().map(Some).collect();
        order
            .into_iter()
            .enumerate()
            .filter_map(|(rank, i)| {
                slots[i].take().map(|e| RankedModel {
                    rank: rank + 1,
                    subset: e.subset,
                    model: e.model,
                })
            })
            .collect()
    }
}
