//! Least squares via the normal equations.
//!
//! We solve
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! by forming `XᵗWX | XᵗWy` and running one Gauss-Jordan elimination over the
//! augmented system. The same elimination yields `(XᵗWX)⁻¹`, whose diagonal gives
//! the coefficient variances needed for the t-statistics.
//!
//! The design matrices here are narrow (intercept plus a handful of variables
//! or components), so the normal equations are cheap and adequately conditioned
//! once zero-variance columns have been screened out upstream.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::math::matrix::{MatrixError, multiply, multiply_vector, solve_augmented, transpose};

/// Minimum residual degrees of freedom for a fit to be considered at all.
pub const MIN_RESIDUAL_DOF: usize = 4;

/// Relative tolerance under which a centered sum of squares counts as zero.
const ZERO_VARIANCE_RTOL: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("{observations} observations leave fewer than 4 residual degrees of freedom for {parameters} parameters")]
    InsufficientDof {
        observations: usize,
        parameters: usize,
    },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// A solved least squares problem and its diagnostics.
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// Coefficients in design-matrix column order (intercept first).
    pub coefficients: Vec<f64>,
    pub t_statistics: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub sse: f64,
    pub mse: f64,
    pub std_error: f64,
    /// Pearson correlation between fitted and observed values.
    pub r: f64,
    /// Residual degrees of freedom (`n - p`).
    pub dof: usize,
}

/// Prepend a column of ones to `columns`.
pub fn with_intercept(columns: &DMatrix<f64>) -> DMatrix<f64> {
    let n = columns.nrows();
    DMatrix::from_fn(n, columns.ncols() + 1, |i, j| {
        if j == 0 { 1.0 } else { columns[(i, j - 1)] }
    })
}

/// Solve a (optionally weighted) least squares problem.
///
/// `x` must already contain the intercept column if one is wanted.
pub fn solve_normal_equations(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    weights: Option<&DVector<f64>>,
) -> Result<LeastSquaresFit, SolveError> {
    let n = x.nrows();
    let p = x.ncols();
    if y.len() != n {
        return Err(MatrixError::DimensionMismatch {
            expected: (n, 1),
            found: (y.len(), 1),
        }
        .into());
    }
    if let Some(w) = weights {
        if w.len() != n {
            return Err(MatrixError::DimensionMismatch {
                expected: (n, 1),
                found: (w.len(), 1),
            }
            .into());
        }
    }
    if n < p + MIN_RESIDUAL_DOF {
        return Err(SolveError::InsufficientDof {
            observations: n,
            parameters: p,
        });
    }
    let dof = n - p;

    let mut xtw = transpose(x)?;
    if let Some(w) = weights {
        for i in 0..n {
            for j in 0..p {
                xtw[(j, i)] *= w[i];
            }
        }
    }
    let xtwx = multiply(&xtw, x)?;
    let xtwy = multiply_vector(&xtw, y)?;

    let augmented = DMatrix::from_fn(p, p + 1, |i, j| if j < p { xtwx[(i, j)] } else { xtwy[i] });
    let inversion = solve_augmented(&augmented)?;
    let beta = inversion
        .solution
        .ok_or(MatrixError::DimensionMismatch {
            expected: (p, p + 1),
            found: augmented.shape(),
        })?;

    let fitted = multiply_vector(x, &beta)?;
    let residuals = y - &fitted;
    let sse: f64 = match weights {
        Some(w) => residuals.iter().zip(w.iter()).map(|(r, wi)| wi * r * r).sum(),
        None => residuals.iter().map(|r| r * r).sum(),
    };
    let mse = sse / dof as f64;
    let std_error = mse.sqrt();

    let t_statistics = (0..p)
        .map(|j| t_statistic(beta[j], inversion.inverse[(j, j)], mse))
        .collect();

    let r = pearson(fitted.as_slice(), y.as_slice()).unwrap_or(0.0);

    Ok(LeastSquaresFit {
        coefficients: beta.iter().copied().collect(),
        t_statistics,
        fitted: fitted.iter().copied().collect(),
        residuals: residuals.iter().copied().collect(),
        sse,
        mse,
        std_error,
        r,
        dof,
    })
}

fn t_statistic(coefficient: f64, inverse_diagonal: f64, mse: f64) -> f64 {
    let se = (inverse_diagonal.max(0.0) * mse).sqrt();
    if se > 0.0 {
        coefficient / se
    } else if coefficient == 0.0 {
        0.0
    } else {
        // Exact fit: any non-zero coefficient is infinitely significant.
        coefficient.signum() * f64::INFINITY
    }
}

/// Pearson correlation from raw sums.
///
/// Returns `None` when either series has (numerically) zero variance or the
/// lengths differ.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }
    let n = x.len() as f64;
    let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        sx += a;
        sy += b;
        sxx += a * a;
        syy += b * b;
        sxy += a * b;
    }
    let vx = n * sxx - sx * sx;
    let vy = n * syy - sy * sy;
    if vx <= ZERO_VARIANCE_RTOL * n * sxx || vy <= ZERO_VARIANCE_RTOL * n * syy {
        return None;
    }
    let r = (n * sxy - sx * sy) / (vx * vy).sqrt();
    Some(r.clamp(-1.0, 1.0))
}

/// True when the series is constant up to rounding.
pub fn has_zero_variance(x: &[f64]) -> bool {
    if x.len() < 2 {
        return true;
    }
    let n = x.len() as f64;
    let sx: f64 = x.iter().sum();
    let sxx: f64 = x.iter().map(|v| v * v).sum();
    n * sxx - sx * sx <= ZERO_VARIANCE_RTOL * n * sxx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_equations_recover_exact_line() {
        let x = with_intercept(&DMatrix::from_column_slice(6, 1, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        let y = DVector::from_row_slice(&[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);

        let fit = solve_normal_equations(&x, &y, None).unwrap();
        assert!(fit.coefficients[0].abs() < 1e-10);
        assert!((fit.coefficients[1] - 2.0).abs() < 1e-10);
        assert!(fit.std_error < 1e-6);
        assert!((fit.r - 1.0).abs() < 1e-12);
        assert_eq!(fit.dof, 4);
        assert!(fit.t_statistics[1].abs() > 1e6);
    }

    #[test]
    fn matches_closed_form_simple_regression() {
        let xs = [1.0, 2.0, 4.0, 5.0, 7.0, 8.0, 10.0];
        let ys = [2.3, 2.9, 5.1, 5.4, 8.2, 8.4, 10.9];
        let n = xs.len() as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let my = ys.iter().sum::<f64>() / n;
        let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
        let sxx: f64 = xs.iter().map(|x| (x - mx) * (x - mx)).sum();
        let slope = sxy / sxx;
        let intercept = my - slope * mx;

        let x = with_intercept(&DMatrix::from_column_slice(7, 1, &xs));
        let fit = solve_normal_equations(&x, &DVector::from_row_slice(&ys), None).unwrap();
        assert!((fit.coefficients[0] - intercept).abs() < 1e-10);
        assert!((fit.coefficients[1] - slope).abs() < 1e-10);

        let sse: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| {
                let e = y - intercept - slope * x;
                e * e
            })
            .sum();
        let se = (sse / 5.0).sqrt();
        assert!((fit.std_error - se).abs() < 1e-10);
        let slope_t = slope / (se / sxx.sqrt());
        assert!((fit.t_statistics[1] - slope_t).abs() < 1e-8);
    }

    #[test]
    fn weights_shift_the_fit_towards_heavy_rows() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let ys = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 20.0];
        let x = with_intercept(&DMatrix::from_column_slice(7, 1, &xs));
        let y = DVector::from_row_slice(&ys);

        let plain = solve_normal_equations(&x, &y, None).unwrap();
        let w = DVector::from_row_slice(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1e-6]);
        let weighted = solve_normal_equations(&x, &y, Some(&w)).unwrap();
        assert!((weighted.coefficients[1] - 1.0).abs() < 1e-3);
        assert!(plain.coefficients[1] > weighted.coefficients[1]);
    }

    #[test]
    fn rejects_too_few_degrees_of_freedom() {
        let x = with_intercept(&DMatrix::from_column_slice(5, 1, &[1.0, 2.0, 3.0, 4.0, 5.0]));
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(matches!(
            solve_normal_equations(&x, &y, None),
            Err(SolveError::InsufficientDof { observations: 5, parameters: 2 })
        ));
    }

    #[test]
    fn collinear_design_is_singular() {
        let cols = DMatrix::from_fn(8, 2, |i, j| (i as f64 + 1.0) * (j as f64 + 1.0));
        let x = with_intercept(&cols);
        let y = DVector::from_fn(8, |i, _| i as f64);
        assert!(matches!(
            solve_normal_equations(&x, &y, None),
            Err(SolveError::Matrix(MatrixError::Singular { .. }))
        ));
    }

    #[test]
    fn pearson_handles_degenerate_series() {
        assert!(pearson(&[0.1; 8], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).is_none());
        assert!(pearson(&[1.0, 2.0], &[1.0]).is_none());
        let r = pearson(&[1.0, 2.0, 3.0, 4.0], &[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert!(has_zero_variance(&[3.3; 5]));
        assert!(!has_zero_variance(&[3.3, 3.4]));
    }
}
