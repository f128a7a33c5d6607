//! Fitting and screening a single combination.
//!
//! Given a subset of candidate variables we:
//! - drop rows with a missing value in Y or any selected column
//! - screen out zero-variance columns
//! - fit plain OLS for one variable, or principal-component regression for
//!   several, adding components while each new one is significant
//! - map PCR coefficients back to the original variables and require each sign
//!   to agree with that variable's raw correlation with Y
//!
//! Everything here is a pure function of its inputs, so the engine can run many
//! evaluations in parallel.

use nalgebra::{DMatrix, DVector};

use crate::domain::{CandidateModel, Sample, SearchConfig};
use crate::error::CandidateError;
use crate::math::{
    LeastSquaresFit, PcaError, SolveError, has_zero_variance, pearson, principal_components,
    solve_normal_equations, with_intercept,
};
use crate::search::subset::VariableSubset;
use crate::stats::StatisticalTables;

/// Everything an evaluation needs, shared read-only across workers.
pub struct Evaluator<'a> {
    pub sample: &'a Sample,
    pub config: &'a SearchConfig,
    pub tables: &'a (dyn StatisticalTables + Sync),
}

/// Rows, response and selected columns for one subset.
struct Block {
    vars: Vec<usize>,
    rows: Vec<usize>,
    y: DVector<f64>,
    x: DMatrix<f64>,
    weights: Option<DVector<f64>>,
}

impl<'a> Evaluator<'a> {
    pub fn evaluate(&self, subset: &VariableSubset) -> Result<CandidateModel, CandidateError> {
        let block = self.block(subset)?;
        if block.vars.len() == 1 {
            self.fit_ordinary(&block)
        } else {
            self.fit_components(&block)
        }
    }

    fn block(&self, subset: &VariableSubset) -> Result<Block, CandidateError> {
        let vars: Vec<usize> = subset.members().collect();
        if vars.is_empty() {
            return Err(CandidateError::Numerical("empty combination".into()));
        }
        let rows = self.sample.usable_rows(subset);
        if rows.len() < self.config.min_observations {
            return Err(CandidateError::InsufficientData {
                available: rows.len(),
                required: self.config.min_observations,
            });
        }

        let data = self.sample.independent();
        let x = DMatrix::from_fn(rows.len(), vars.len(), |i, k| data[(rows[i], vars[k])]);
        for (k, &v) in vars.iter().enumerate() {
            let col: Vec<f64> = x.column(k).iter().copied().collect();
            if has_zero_variance(&col) {
                return Err(CandidateError::Numerical(format!(
                    "{} has zero variance",
                    self.sample.name(v)
                )));
            }
        }

        let y_all = self.sample.dependent();
        let y = DVector::from_iterator(rows.len(), rows.iter().map(|&i| y_all[i]));
        let weights = self
            .sample
            .weights()
            .map(|w| DVector::from_iterator(rows.len(), rows.iter().map(|&i| w[i])));

        Ok(Block {
            vars,
            rows,
            y,
            x,
            weights,
        })
    }

    fn solve(&self, design: &DMatrix<f64>, block: &Block) -> Result<LeastSquaresFit, CandidateError> {
        let fit = solve_normal_equations(design, &block.y, block.weights.as_ref()).map_err(|e| match e {
            SolveError::InsufficientDof {
                observations,
                parameters,
            } => CandidateError::InsufficientData {
                available: observations,
                required: parameters + crate::math::MIN_RESIDUAL_DOF,
            },
            SolveError::Matrix(m) => CandidateError::Numerical(m.to_string()),
        })?;
        if !fit.std_error.is_finite() || fit.coefficients.iter().any(|b| !b.is_finite()) {
            return Err(CandidateError::Numerical("non-finite least squares solution".into()));
        }
        Ok(fit)
    }

    fn critical(&self, dof: usize) -> f64 {
        self.config.significance.critical_t(dof, self.tables)
    }

    /// OLS on the raw variables; every variable coefficient must be significant.
    fn fit_ordinary(&self, block: &Block) -> Result<CandidateModel, CandidateError> {
        let design = with_intercept(&block.x);
        let fit = self.solve(&design, block)?;
        let critical = self.critical(fit.dof);
        for (k, &v) in block.vars.iter().enumerate() {
            let t = fit.t_statistics[k + 1];
            if !(t.abs() >= critical) {
                return Err(CandidateError::NotSignificant {
                    term: self.sample.name(v).to_string(),
                    t,
                    critical,
                });
            }
        }

        let mut coefficients = vec![None; self.sample.n_vars()];
        for (k, &v) in block.vars.iter().enumerate() {
            coefficients[v] = Some(fit.coefficients[k + 1]);
        }
        Ok(self.model(block, &fit, fit.coefficients[0], coefficients, 0))
    }

    /// Principal-component regression with forward component selection.
    fn fit_components(&self, block: &Block) -> Result<CandidateModel, CandidateError> {
        let max_components = self.config.max_components.unwrap_or(self.sample.n_vars());
        let basis = principal_components(&block.x, max_components).map_err(|e| self.pca_failure(block, e))?;

        let mut accepted: Option<LeastSquaresFit> = None;
        let mut first_failure: Option<CandidateError> = None;
        for c in 1..=basis.retained() {
            let design = with_intercept(&basis.components.columns(0, c).into_owned());
            let fit = match self.solve(&design, block) {
                Ok(fit) => fit,
                Err(e) => {
                    first_failure = Some(e);
                    break;
                }
            };
            let critical = self.critical(fit.dof);
            let t = fit.t_statistics[c];
            if !(t.abs() >= critical) {
                first_failure = Some(CandidateError::NotSignificant {
                    term: format!("component {c}"),
                    t,
                    critical,
                });
                break;
            }
            accepted = Some(fit);
        }

        let Some(fit) = accepted else {
            return Err(first_failure.unwrap_or_else(|| CandidateError::Numerical("no components".into())));
        };
        let used = fit.coefficients.len() - 1;
        let (intercept, original) = basis.back_transform(fit.coefficients[0], &fit.coefficients[1..]);

        let y: Vec<f64> = block.y.iter().copied().collect();
        let mut coefficients = vec![None; self.sample.n_vars()];
        for (k, &v) in block.vars.iter().enumerate() {
            let col: Vec<f64> = block.x.column(k).iter().copied().collect();
            let Some(r) = pearson(&col, &y) else {
                return Err(CandidateError::Numerical(format!(
                    "correlation of {} with {} is undefined",
                    self.sample.name(v),
                    self.sample.dependent_name()
                )));
            };
            if !(original[k] * r > 0.0) {
                return Err(CandidateError::SignMismatch {
                    variable: self.sample.name(v).to_string(),
                });
            }
            coefficients[v] = Some(original[k]);
        }

        Ok(self.model(block, &fit, intercept, coefficients, used))
    }

    /// Every component failure is numerical; name the variables where we can.
    fn pca_failure(&self, block: &Block, err: PcaError) -> CandidateError {
        let name = |k: usize| self.sample.name(block.vars[k]);
        match err {
            PcaError::ZeroVariance(k) => CandidateError::Numerical(format!("{} has zero variance", name(k))),
            PcaError::Collinear(a, b) => {
                CandidateError::Numerical(format!("{} and {} are perfectly correlated", name(a), name(b)))
            }
            other => CandidateError::Numerical(other.to_string()),
        }
    }

    fn model(
        &self,
        block: &Block,
        fit: &LeastSquaresFit,
        intercept: f64,
        coefficients: Vec<Option<f64>>,
        components: usize,
    ) -> CandidateModel {
        CandidateModel {
            intercept,
            coefficients,
            t_statistics: fit.t_statistics.clone(),
            r: fit.r,
            std_error: fit.std_error,
            n_obs: block.rows.len(),
            components,
            rows: block.rows.clone(),
            fitted: fit.fitted.clone(),
            residuals: fit.residuals.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Significance;
    use crate::math::EigenError;
    use crate::stats::ApproxStudentT;

    fn evaluate(sample: &Sample, config: &SearchConfig, members: &[usize]) -> Result<CandidateModel, CandidateError> {
        let ev = Evaluator {
            sample,
            config,
            tables: &ApproxStudentT,
        };
        ev.evaluate(&VariableSubset::from_members(sample.n_vars(), members).unwrap())
    }

    fn noisy_line(n: usize) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.0 + 0.5 * v + if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect();
        (x, y)
    }

    #[test]
    fn single_variable_uses_ols() {
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0];
        let sample = Sample::from_columns(y, &[vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]]).unwrap();
        let m = evaluate(&sample, &SearchConfig::default(), &[0]).unwrap();
        assert!(m.intercept.abs() < 1e-9);
        assert!((m.coefficients[0].unwrap() - 2.0).abs() < 1e-9);
        assert!((m.r - 1.0).abs() < 1e-12);
        assert!(m.std_error < 1e-6);
        assert_eq!(m.components, 0);
        assert_eq!(m.n_obs, 6);
    }

    #[test]
    fn zero_variance_column_is_numerical_failure() {
        let (x, y) = noisy_line(10);
        let sample = Sample::from_columns(y, &[x, vec![0.1; 10]]).unwrap();
        let config = SearchConfig::default();
        assert!(matches!(evaluate(&sample, &config, &[1]), Err(CandidateError::Numerical(_))));
        assert!(matches!(evaluate(&sample, &config, &[0, 1]), Err(CandidateError::Numerical(_))));
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let (x, y) = noisy_line(5);
        let sample = Sample::from_columns(y, &[x]).unwrap();
        assert!(matches!(
            evaluate(&sample, &SearchConfig::default(), &[0]),
            Err(CandidateError::InsufficientData { available: 5, .. })
        ));

        // Enough rows for the minimum, but not for 4 residual degrees of freedom.
        let (x, y) = noisy_line(6);
        let sample = Sample::from_columns(y, &[x]).unwrap();
        let config = SearchConfig {
            min_observations: 3,
            ..SearchConfig::default()
        };
        let (x5, y5) = noisy_line(5);
        let short = Sample::from_columns(y5, &[x5]).unwrap();
        assert!(evaluate(&sample, &config, &[0]).is_ok());
        assert!(matches!(
            evaluate(&short, &config, &[0]),
            Err(CandidateError::InsufficientData { .. })
        ));
    }

    #[test]
    fn insignificant_slope_is_rejected() {
        let x: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..12).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let sample = Sample::from_columns(y, &[x]).unwrap();
        assert!(matches!(
            evaluate(&sample, &SearchConfig::default(), &[0]),
            Err(CandidateError::NotSignificant { .. })
        ));
    }

    #[test]
    fn pcr_model_has_consistent_signs() {
        let n = 20;
        let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64).collect();
        let y: Vec<f64> = (0..n)
            .map(|i| 2.0 + 1.5 * a[i] + 0.8 * b[i] + if i % 3 == 0 { 0.2 } else { -0.1 })
            .collect();
        let sample = Sample::from_columns(y.clone(), &[a.clone(), b.clone()]).unwrap();

        let m = evaluate(&sample, &SearchConfig::default(), &[0, 1]).unwrap();
        assert!(m.components >= 1);
        for (k, col) in [&a, &b].into_iter().enumerate() {
            let r = pearson(col, &y).unwrap();
            assert!(m.coefficients[k].unwrap() * r > 0.0);
        }
        // Back-transformed coefficients reproduce the fitted values.
        for (idx, &row) in m.rows.iter().enumerate() {
            let pred = m.predict(&[a[row], b[row]]);
            assert!((pred - m.fitted[idx]).abs() < 1e-8);
        }
        if m.components == 2 {
            assert!((m.coefficients[0].unwrap() - 1.5).abs() < 0.05);
            assert!((m.coefficients[1].unwrap() - 0.8).abs() < 0.05);
        }
    }

    #[test]
    fn duplicated_columns_are_numerical_failure() {
        let (x, y) = noisy_line(12);
        let sample = Sample::from_columns(y, &[x.clone(), x]).unwrap();
        match evaluate(&sample, &SearchConfig::default(), &[0, 1]) {
            Err(CandidateError::Numerical(message)) => assert!(message.contains("X1 and X2")),
            other => panic!("expected a numerical failure, got {other:?}"),
        }
    }

    #[test]
    fn eigen_failure_maps_to_numerical() {
        let (x, y) = noisy_line(12);
        let sample = Sample::from_columns(y, &[x.clone(), x]).unwrap();
        let config = SearchConfig::default();
        let ev = Evaluator {
            sample: &sample,
            config: &config,
            tables: &ApproxStudentT,
        };
        let block = ev.block(&VariableSubset::from_members(2, &[0, 1]).unwrap()).unwrap();
        let err = ev.pca_failure(&block, PcaError::Eigen(EigenError::NotConverged { sweeps: 50 }));
        assert!(matches!(err, CandidateError::Numerical(m) if m.contains("did not converge")));
    }

    #[test]
    fn sentinel_rows_are_left_out_of_the_fit() {
        let (mut x, mut y) = noisy_line(12);
        x[3] = -999.0;
        y[7] = -1.0;
        x[9] = f64::NAN;
        let sample = Sample::from_columns(y, &[x]).unwrap().with_missing(Some(-1.0), Some(-999.0));
        let m = evaluate(&sample, &SearchConfig::default(), &[0]).unwrap();
        assert_eq!(m.n_obs, 9);
        assert_eq!(m.rows, vec![0, 1, 2, 4, 5, 6, 8, 10, 11]);
        assert_eq!(m.residuals.len(), 9);
        assert!((m.coefficients[0].unwrap() - 0.5).abs() < 0.1);
    }

    #[test]
    fn sign_mismatch_rejects_pcr_model() {
        // y rises with both a and b jointly, but b alone is negatively
        // correlated with y; forcing the t threshold to zero keeps every
        // component, so the full back-transform carries b's partial effect.
        let n = 24;
        let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..n).map(|i| i as f64 + if i % 2 == 0 { 3.0 } else { -3.0 }).collect();
        let y: Vec<f64> = (0..n).map(|i| 3.0 * a[i] - 1.0 * b[i]).collect();
        let sample = Sample::from_columns(y.clone(), &[a, b.clone()]).unwrap();
        let r_b = pearson(&b, &y).unwrap();
        assert!(r_b > 0.0);

        let config = SearchConfig {
            significance: Significance::CriticalT(0.0),
            ..SearchConfig::default()
        };
        assert!(matches!(
            evaluate(&sample, &config, &[0, 1]),
            Err(CandidateError::SignMismatch { .. })
        ));
    }
}
