//! Principal components of a small block of candidate variables.
//!
//! Variables are standardized, their correlation matrix is eigen-decomposed
//! with Jacobi, and the z-scores are projected onto the eigenvectors. Components
//! come out ordered by descending eigenvalue, so "use the first c components"
//! always means "use the c directions explaining the most variance".

use nalgebra::DMatrix;
use thiserror::Error;

use crate::math::eigen::{EigenError, EigenResult, jacobi};
use crate::math::ols::pearson;

/// Correlations within this distance of ±1, and eigenvalues below it, mark an
/// exact linear dependency between variables.
pub const COLLINEAR_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PcaError {
    #[error("variable {0} has zero variance")]
    ZeroVariance(usize),
    #[error("variables {0} and {1} have an undefined correlation")]
    UndefinedCorrelation(usize, usize),
    #[error("variables {0} and {1} are perfectly correlated")]
    Collinear(usize, usize),
    #[error("variables are linearly dependent (smallest eigenvalue {0:e})")]
    RankDeficient(f64),
    #[error("at least two observations are required, found {0}")]
    TooFewObservations(usize),
    #[error(transparent)]
    Eigen(#[from] EigenError),
}

/// Standardization statistics, eigen-basis and projected components.
#[derive(Debug, Clone)]
pub struct ComponentBasis {
    pub means: Vec<f64>,
    /// Sample standard deviations (n - 1 denominator).
    pub std_devs: Vec<f64>,
    pub correlation: DMatrix<f64>,
    pub eigen: EigenResult,
    /// `n × retained` matrix of component scores.
    pub components: DMatrix<f64>,
}

impl ComponentBasis {
    pub fn retained(&self) -> usize {
        self.components.ncols()
    }

    /// Map a regression on the leading components back to the original
    /// variables.
    ///
    /// `coefficients[j]` multiplies component `j`; only as many components as
    /// coefficients are used. Returns `(intercept, per-variable coefficients)`.
    pub fn back_transform(&self, intercept: f64, coefficients: &[f64]) -> (f64, Vec<f64>) {
        let m = self.means.len();
        let mut original = vec![0.0; m];
        for (k, slot) in original.iter_mut().enumerate() {
            let gamma: f64 = coefficients
                .iter()
                .enumerate()
                .map(|(j, alpha)| self.eigen.vectors[(k, j)] * alpha)
                .sum();
            *slot = gamma / self.std_devs[k];
        }
        let shift: f64 = original.iter().zip(&self.means).map(|(b, mean)| b * mean).sum();
        (intercept - shift, original)
    }
}

/// Compute the principal components of the columns of `data` (`n × m`),
/// retaining at most `max_components` of them.
pub fn principal_components(data: &DMatrix<f64>, max_components: usize) -> Result<ComponentBasis, PcaError> {
    let n = data.nrows();
    let m = data.ncols();
    if n < 2 {
        return Err(PcaError::TooFewObservations(n));
    }

    let mut means = Vec::with_capacity(m);
    let mut std_devs = Vec::with_capacity(m);
    for k in 0..m {
        let col = data.column(k);
        let mean = col.sum() / n as f64;
        let ss: f64 = col.iter().map(|v| (v - mean) * (v - mean)).sum();
        let sd = (ss / (n - 1) as f64).sqrt();
        if !(sd > 0.0 && sd.is_finite()) {
            return Err(PcaError::ZeroVariance(k));
        }
        means.push(mean);
        std_devs.push(sd);
    }

    let columns: Vec<Vec<f64>> = (0..m).map(|k| data.column(k).iter().copied().collect()).collect();
    let mut correlation = DMatrix::<f64>::identity(m, m);
    for a in 0..m {
        for b in a + 1..m {
            let r = pearson(&columns[a], &columns[b]).ok_or(PcaError::UndefinedCorrelation(a, b))?;
            if 1.0 - r.abs() < COLLINEAR_TOLERANCE {
                return Err(PcaError::Collinear(a, b));
            }
            correlation[(a, b)] = r;
            correlation[(b, a)] = r;
        }
    }

    let eigen = jacobi(&correlation)?;
    let smallest = eigen.values[m - 1];
    if smallest < COLLINEAR_TOLERANCE {
        return Err(PcaError::RankDeficient(smallest));
    }

    let retained = m.min(max_components.max(1));
    let z = DMatrix::from_fn(n, m, |i, k| (data[(i, k)] - means[k]) / std_devs[k]);
    let components = z * eigen.vectors.columns(0, retained);

    Ok(ComponentBasis {
        means,
        std_devs,
        correlation,
        eigen,
        components,
    })
}
