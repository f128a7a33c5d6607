//! Cyclic Jacobi eigen-decomposition for small symmetric matrices.
//!
//! The correlation matrices we decompose are at most a few dozen variables
//! wide, so the O(n³)-per-sweep cost is irrelevant next to its robustness: every
//! rotation is orthogonal and the eigenvectors come out orthonormal to working
//! precision.
//!
//! Only the upper triangle of the input is read.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::math::matrix::{MatrixError, index_sort};

/// Sweep cap before giving up.
pub const MAX_SWEEPS: usize = 50;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EigenError {
    #[error(transparent)]
    Shape(#[from] MatrixError),
    #[error("Jacobi iteration did not converge within {sweeps} sweeps")]
    NotConverged { sweeps: usize },
}

/// Eigenvalues sorted descending with matching eigenvector columns.
#[derive(Debug, Clone)]
pub struct EigenResult {
    pub values: DVector<f64>,
    pub vectors: DMatrix<f64>,
    /// Sweeps performed before the off-diagonal mass reached zero.
    pub sweeps: usize,
}

pub fn jacobi(input: &DMatrix<f64>) -> Result<EigenResult, EigenError> {
    if input.is_empty() {
        return Err(MatrixError::Empty.into());
    }
    let n = input.nrows();
    if input.ncols() != n {
        return Err(MatrixError::DimensionMismatch {
            expected: (n, n),
            found: input.shape(),
        }
        .into());
    }

    let mut a = input.clone();
    let mut v = DMatrix::<f64>::identity(n, n);
    let mut d: Vec<f64> = (0..n).map(|i| a[(i, i)]).collect();
    let mut b = d.clone();
    let mut z = vec![0.0; n];

    for sweep in 1..=MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n - 1 {
            for q in p + 1..n {
                off += a[(p, q)].abs();
            }
        }
        if off == 0.0 {
            return Ok(sorted_descending(d, v, sweep - 1));
        }

        let threshold = if sweep < 4 {
            0.2 * off / (n * n) as f64
        } else {
            0.0
        };

        for p in 0..n - 1 {
            for q in p + 1..n {
                let apq = a[(p, q)];
                let g = 100.0 * apq.abs();
                if sweep > 4 && d[p].abs() + g == d[p].abs() && d[q].abs() + g == d[q].abs() {
                    a[(p, q)] = 0.0;
                } else if apq.abs() > threshold {
                    let h = d[q] - d[p];
                    let t = if h.abs() + g == h.abs() {
                        apq / h
                    } else {
                        let theta = 0.5 * h / apq;
                        let t = 1.0 / (theta.abs() + (1.0 + theta * theta).sqrt());
                        if theta < 0.0 { -t } else { t }
                    };
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = t * c;
                    let tau = s / (1.0 + c);
                    let h = t * apq;
                    z[p] -= h;
                    z[q] += h;
                    d[p] -= h;
                    d[q] += h;
                    a[(p, q)] = 0.0;

                    for j in 0..p {
                        rotate(&mut a, s, tau, (j, p), (j, q));
                    }
                    for j in p + 1..q {
                        rotate(&mut a, s, tau, (p, j), (j, q));
                    }
                    for j in q + 1..n {
                        rotate(&mut a, s, tau, (p, j), (q, j));
                    }
                    for j in 0..n {
                        rotate(&mut v, s, tau, (j, p), (j, q));
                    }
                }
            }
        }

        for i in 0..n {
            b[i] += z[i];
            d[i] = b[i];
            z[i] = 0.0;
        }
    }

    Err(EigenError::NotConverged { sweeps: MAX_SWEEPS })
}

fn rotate(m: &mut DMatrix<f64>, s: f64, tau: f64, first: (usize, usize), second: (usize, usize)) {
    let g = m[first];
    let h = m[second];
    m[first] = g - s * (h + g * tau);
    m[second] = h + s * (g - h * tau);
}

fn sorted_descending(values: Vec<f64>, vectors: DMatrix<f64>, sweeps: usize) -> EigenResult {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    let order = index_sort(&negated);
    let n = values.len();

    let sorted_values = DVector::from_iterator(n, order.iter().map(|&i| values[i]));
    let sorted_vectors = DMatrix::from_fn(n, n, |row, col| vectors[(row, order[col])]);

    EigenResult {
        values: sorted_values,
        vectors: sorted_vectors,
        sweeps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn reconstruct(e: &EigenResult) -> DMatrix<f64> {
        &e.vectors * DMatrix::from_diagonal(&e.values) * e.vectors.transpose()
    }

    #[test]
    fn two_by_two_eigenpairs() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let e = jacobi(&a).unwrap();
        assert!((e.values[0] - 3.0).abs() < 1e-12);
        assert!((e.values[1] - 1.0).abs() < 1e-12);

        // Leading eigenvector is (1, 1)/√2 up to sign.
        let v0 = e.vectors.column(0);
        assert!((v0[0].abs() - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((v0[0] - v0[1]).abs() < 1e-12);
    }

    #[test]
    fn diagonal_input_converges_without_rotation() {
        let a = DMatrix::from_diagonal(&DVector::from_row_slice(&[1.0, 5.0, 3.0]));
        let e = jacobi(&a).unwrap();
        assert_eq!(e.sweeps, 0);
        assert_eq!(e.values.as_slice(), &[5.0, 3.0, 1.0]);
        assert_eq!(e.vectors[(1, 0)], 1.0);

        let single = DMatrix::from_element(1, 1, 4.0);
        assert_eq!(jacobi(&single).unwrap().values[0], 4.0);
    }

    #[test]
    fn random_symmetric_round_trip() {
        let mut rng = StdRng::seed_from_u64(11);
        for n in 2..=7 {
            let m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
            let sym = (&m + m.transpose()) * 0.5;
            let e = jacobi(&sym).unwrap();

            for w in e.values.as_slice().windows(2) {
                assert!(w[0] >= w[1]);
            }
            let back = reconstruct(&e);
            for (x, y) in back.iter().zip(sym.iter()) {
                assert!((x - y).abs() < 1e-10);
            }
            let gram = e.vectors.transpose() * &e.vectors;
            for i in 0..n {
                for j in 0..n {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!((gram[(i, j)] - expected).abs() < 1e-10);
                }
            }
        }
    }

    #[test]
    fn nan_entry_never_converges() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, f64::NAN, 1.0]);
        assert_eq!(jacobi(&a).unwrap_err(), EigenError::NotConverged { sweeps: MAX_SWEEPS });
        assert_eq!(MAX_SWEEPS, 50);
    }

    #[test]
    fn rejects_non_square_input() {
        let a = DMatrix::<f64>::zeros(2, 3);
        assert!(matches!(jacobi(&a), Err(EigenError::Shape(_))));
        assert!(matches!(
            jacobi(&DMatrix::<f64>::zeros(0, 0)),
            Err(EigenError::Shape(MatrixError::Empty))
        ));
    }
}
