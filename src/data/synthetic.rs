//! Synthetic regression samples.
//!
//! `Y = 1 + sum(beta_j * X_j) + noise` where only the first `informative`
//! candidates carry signal. Candidates are mildly collinear (each shares a
//! common latent factor) so multi-variable combinations exercise the
//! principal-component path. Generation is fully determined by the options.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::DataSource;
use crate::domain::Sample;
use crate::error::SearchError;

/// Value written into cells dropped by `missing_rate`.
pub const MISSING_SENTINEL: f64 = -999.0;

/// Weight of the shared latent factor in every candidate column.
const COMMON_FACTOR: f64 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticOptions {
    pub rows: usize,
    pub candidates: usize,
    /// Leading candidates that actually drive Y.
    pub informative: usize,
    /// Standard deviation of the additive noise on Y.
    pub noise: f64,
    /// Probability that any single candidate cell is replaced by the sentinel.
    pub missing_rate: f64,
    pub seed: u64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            rows: 120,
            candidates: 8,
            informative: 3,
            noise: 0.5,
            missing_rate: 0.0,
            seed: 42,
        }
    }
}

impl SyntheticOptions {
    fn validate(&self) -> Result<(), SearchError> {
        if self.rows == 0 {
            return Err(SearchError::Data("row count must be > 0".into()));
        }
        if self.candidates == 0 {
            return Err(SearchError::Data("candidate count must be > 0".into()));
        }
        if self.informative > self.candidates {
            return Err(SearchError::Data(format!(
                "{} informative variables requested but only {} candidates",
                self.informative, self.candidates
            )));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(SearchError::Data("noise must be a non-negative number".into()));
        }
        if !(0.0..1.0).contains(&self.missing_rate) {
            return Err(SearchError::Data("missing rate must lie in [0, 1)".into()));
        }
        Ok(())
    }
}

/// `DataSource` wrapper around [`generate`].
#[derive(Debug, Clone, Default)]
pub struct SyntheticSource(pub SyntheticOptions);

impl DataSource for SyntheticSource {
    fn load(&self) -> Result<Sample, SearchError> {
        generate(&self.0)
    }

    fn describe(&self) -> String {
        let o = &self.0;
        format!(
            "synthetic sample ({} rows, {} candidates, {} informative, seed {})",
            o.rows, o.candidates, o.informative, o.seed
        )
    }
}

/// True coefficient of candidate `j` (zero for non-informative ones).
pub fn true_coefficient(options: &SyntheticOptions, j: usize) -> f64 {
    if j < options.informative {
        2.0 / (j + 1) as f64
    } else {
        0.0
    }
}

pub fn generate(options: &SyntheticOptions) -> Result<Sample, SearchError> {
    options.validate()?;

    let mut rng = StdRng::seed_from_u64(sample_seed(options));
    let normal = Normal::new(0.0, 1.0).map_err(|e| SearchError::Data(format!("noise distribution error: {e}")))?;

    let mut columns = vec![Vec::with_capacity(options.rows); options.candidates];
    let mut y = Vec::with_capacity(options.rows);
    for _ in 0..options.rows {
        let latent: f64 = normal.sample(&mut rng);
        let mut signal = 1.0;
        for (j, col) in columns.iter_mut().enumerate() {
            let x = COMMON_FACTOR * latent + normal.sample(&mut rng);
            signal += true_coefficient(options, j) * x;
            col.push(x);
        }
        y.push(signal + options.noise * normal.sample(&mut rng));
    }

    if options.missing_rate > 0.0 {
        for col in columns.iter_mut() {
            for cell in col.iter_mut() {
                if rng.r#gen::<f64>() < options.missing_rate {
                    *cell = MISSING_SENTINEL;
                }
            }
        }
    }

    let names = (1..=options.candidates).map(|j| format!("X{j}")).collect();
    Sample::from_columns(y, &columns)?
        .with_missing(None, Some(MISSING_SENTINEL))
        .with_names("Y", names)
}

fn sample_seed(options: &SyntheticOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    options.rows.hash(&mut hasher);
    options.candidates.hash(&mut hasher);
    options.informative.hash(&mut hasher);
    options.noise.to_bits().hash(&mut hasher);
    options.missing_rate.to_bits().hash(&mut hasher);
    options.seed.hash(&mut hasher);
    hasher.finish()
}
