//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during the search
//! - exported to JSON/CSV
//! - printed by the report module without reaching into engine internals

use std::time::Duration;

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::SearchError;
use crate::search::subset::VariableSubset;
use crate::stats::StatisticalTables;

/// One dependent series and its candidate independent variables.
///
/// Immutable once built; construction validates the shape.
#[derive(Debug, Clone)]
pub struct Sample {
    dependent: Vec<f64>,
    independent: DMatrix<f64>,
    dependent_missing: Option<f64>,
    independent_missing: Option<f64>,
    weights: Option<Vec<f64>>,
    dependent_name: String,
    names: Vec<String>,
}

impl Sample {
    /// Build a sample from `y` (length N) and `x` (N × P).
    pub fn new(dependent: Vec<f64>, independent: DMatrix<f64>) -> Result<Self, SearchError> {
        if dependent.is_empty() {
            return Err(SearchError::Data("dependent series is empty".into()));
        }
        if independent.ncols() == 0 {
            return Err(SearchError::Data("no candidate independent variables".into()));
        }
        if independent.nrows() != dependent.len() {
            return Err(SearchError::Data(format!(
                "dependent series has {} rows but the independent matrix has {}",
                dependent.len(),
                independent.nrows()
            )));
        }
        let names = (1..=independent.ncols()).map(|j| format!("X{j}")).collect();
        Ok(Self {
            dependent,
            independent,
            dependent_missing: None,
            independent_missing: None,
            weights: None,
            dependent_name: "Y".to_string(),
            names,
        })
    }

    /// Build a sample from a list of equally long columns.
    pub fn from_columns(dependent: Vec<f64>, columns: &[Vec<f64>]) -> Result<Self, SearchError> {
        let n = dependent.len();
        if let Some((j, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != n) {
            return Err(SearchError::Data(format!(
                "column {} has {} rows, expected {n}",
                j + 1,
                col.len()
            )));
        }
        let x = DMatrix::from_fn(n, columns.len(), |i, j| columns[j][i]);
        Self::new(dependent, x)
    }

    /// Sentinels marking missing values. NaN and infinities are always missing.
    pub fn with_missing(mut self, dependent: Option<f64>, independent: Option<f64>) -> Self {
        self.dependent_missing = dependent;
        self.independent_missing = independent;
        self
    }

    /// Per-row weights for weighted least squares; all must be finite and positive.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self, SearchError> {
        if weights.len() != self.n_rows() {
            return Err(SearchError::Data(format!(
                "{} weights supplied for {} rows",
                weights.len(),
                self.n_rows()
            )));
        }
        if let Some(i) = weights.iter().position(|w| !(w.is_finite() && *w > 0.0)) {
            return Err(SearchError::Data(format!(
                "weight on row {} is not a positive number",
                i + 1
            )));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    pub fn with_names(mut self, dependent: impl Into<String>, names: Vec<String>) -> Result<Self, SearchError> {
        if names.len() != self.n_vars() {
            return Err(SearchError::Data(format!(
                "{} column names supplied for {} variables",
                names.len(),
                self.n_vars()
            )));
        }
        self.dependent_name = dependent.into();
        self.names = names;
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.dependent.len()
    }

    pub fn n_vars(&self) -> usize {
        self.independent.ncols()
    }

    pub fn dependent(&self) -> &[f64] {
        &self.dependent
    }

    pub fn independent(&self) -> &DMatrix<f64> {
        &self.independent
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn dependent_name(&self) -> &str {
        &self.dependent_name
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, var: usize) -> &str {
        &self.names[var]
    }

    pub fn is_dependent_missing(&self, row: usize) -> bool {
        is_missing(self.dependent[row], self.dependent_missing)
    }

    pub fn is_independent_missing(&self, row: usize, var: usize) -> bool {
        is_missing(self.independent[(row, var)], self.independent_missing)
    }

    /// Rows with no missing value in Y or in any variable of `subset`.
    pub fn usable_rows(&self, subset: &VariableSubset) -> Vec<usize> {
        (0..self.n_rows())
            .filter(|&i| !self.is_dependent_missing(i))
            .filter(|&i| subset.members().all(|v| !self.is_independent_missing(i, v)))
            .collect()
    }
}

fn is_missing(value: f64, sentinel: Option<f64>) -> bool {
    !value.is_finite() || sentinel.is_some_and(|s| value == s)
}

/// How coefficient significance is decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Significance {
    /// Fixed critical |t| regardless of degrees of freedom.
    CriticalT(f64),
    /// Two-sided confidence level, looked up per degrees of freedom.
    Confidence(f64),
}

impl Significance {
    pub fn critical_t(&self, dof: usize, tables: &dyn StatisticalTables) -> f64 {
        match *self {
            Significance::CriticalT(t) => t,
            Significance::Confidence(c) => tables.critical_t(c, dof),
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Capacity K of the top-K result store.
    pub max_stored_combinations: usize,
    pub significance: Significance,
    /// Minimum usable rows for a combination to be fitted.
    pub min_observations: usize,
    /// Components retained per combination (`None`: number of candidate variables).
    pub max_components: Option<usize>,
    /// Largest combination size to try (`None`: number of candidate variables).
    pub max_combination_size: Option<usize>,
    /// Stop after this many candidate evaluations.
    pub max_evaluations: Option<usize>,
    /// Stop once this much wall-clock time has elapsed.
    pub time_budget: Option<Duration>,
    /// Evaluate candidates of a level on the rayon pool.
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_stored_combinations: 10,
            significance: Significance::Confidence(0.95),
            min_observations: 6,
            max_components: None,
            max_combination_size: None,
            max_evaluations: None,
            time_budget: None,
            parallel: true,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_stored_combinations == 0 {
            return Err(SearchError::Config("max_stored_combinations must be at least 1".into()));
        }
        match self.significance {
            Significance::CriticalT(t) if !(t.is_finite() && t >= 0.0) => {
                return Err(SearchError::Config(format!("critical t value {t} is not a non-negative number")));
            }
            Significance::Confidence(c) if !(c > 0.0 && c < 1.0) => {
                return Err(SearchError::Config(format!("confidence {c} must lie strictly between 0 and 1")));
            }
            _ => {}
        }
        if self.max_components == Some(0) {
            return Err(SearchError::Config("max_components must be at least 1".into()));
        }
        if self.max_combination_size == Some(0) {
            return Err(SearchError::Config("max_combination_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// A fitted, accepted model for one combination.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateModel {
    pub intercept: f64,
    /// One slot per candidate variable; `None` for variables not in the model.
    pub coefficients: Vec<Option<f64>>,
    /// t-statistics in the space that was tested (intercept first; variables
    /// for OLS, components for PCR).
    pub t_statistics: Vec<f64>,
    pub r: f64,
    pub std_error: f64,
    pub n_obs: usize,
    /// Principal components retained (0 for plain OLS).
    pub components: usize,
    /// Sample rows the model was fitted on.
    pub rows: Vec<usize>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
}

impl CandidateModel {
    pub fn r_squared(&self) -> f64 {
        self.r * self.r
    }

    /// Predict the dependent value for a full row of candidate variables.
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .filter_map(|(b, x)| b.map(|b| b * x))
                .sum::<f64>()
    }
}

/// A stored model with its final rank (1 = lowest standard error).
#[derive(Debug, Clone, Serialize)]
pub struct RankedModel {
    pub rank: usize,
    pub subset: VariableSubset,
    pub model: CandidateModel,
}

/// Counters describing how a search went.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStats {
    pub generated: usize,
    pub evaluated: usize,
    pub stored: usize,
    pub replaced: usize,
    /// Accepted fits that were not good enough for a full store.
    pub discarded: usize,
    pub rejected_numerical: usize,
    pub rejected_insufficient: usize,
    pub rejected_insignificant: usize,
    pub rejected_sign: usize,
    /// Largest combination size the search evaluated at least one candidate of.
    pub deepest_size: usize,
    /// A combination or time budget cut the search short.
    pub truncated: bool,
    pub elapsed_ms: u128,
}

impl SearchStats {
    pub fn rejected(&self) -> usize {
        self.rejected_numerical + self.rejected_insufficient + self.rejected_insignificant + self.rejected_sign
    }
}

/// Ranked models plus search diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub models: Vec<RankedModel>,
    pub stats: SearchStats,
}

impl SearchOutcome {
    pub fn best(&self) -> Option<&RankedModel> {
        self.models.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_validates_shape() {
        assert!(matches!(
            Sample::new(vec![], DMatrix::zeros(0, 2)),
            Err(SearchError::Data(_))
        ));
        assert!(Sample::new(vec![1.0, 2.0], DMatrix::zeros(3, 1)).is_err());
        assert!(Sample::from_columns(vec![1.0, 2.0], &[vec![1.0, 2.0], vec![1.0]]).is_err());
        assert!(Sample::from_columns(vec![1.0, 2.0], &[]).is_err());

        let s = Sample::from_columns(vec![1.0, 2.0], &[vec![3.0, 4.0]]).unwrap();
        assert!(s.clone().with_weights(vec![1.0]).is_err());
        assert!(s.clone().with_weights(vec![1.0, 0.0]).is_err());
        assert!(s.clone().with_names("y", vec!["a".into(), "b".into()]).is_err());
        assert_eq!(s.name(0), "X1");
    }

    #[test]
    fn usable_rows_drop_missing_values() {
        let s = Sample::from_columns(
            vec![1.0, -99.0, 3.0, 4.0, f64::NAN],
            &[vec![1.0, 2.0, -1.0, 4.0, 5.0], vec![1.0, 2.0, 3.0, 4.0, 5.0]],
        )
        .unwrap()
        .with_missing(Some(-99.0), Some(-1.0));

        let only_second = VariableSubset::from_members(2, &[1]).unwrap();
        assert_eq!(s.usable_rows(&only_second), vec![0, 2, 3]);
        let both = VariableSubset::from_members(2, &[0, 1]).unwrap();
        assert_eq!(s.usable_rows(&both), vec![0, 3]);
    }

    #[test]
    fn config_validation() {
        assert!(SearchConfig::default().validate().is_ok());
        let bad = SearchConfig {
            max_stored_combinations: 0,
            ..SearchConfig::default()
        };
        assert!(matches!(bad.validate(), Err(SearchError::Config(_))));
        let bad = SearchConfig {
            significance: Significance::Confidence(1.0),
            ..SearchConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
