//! Dense matrix helpers on top of nalgebra storage.
//!
//! nalgebra already knows how to multiply and transpose; the wrappers here add
//! the shape checks the regression code relies on. The inverse is a hand-rolled
//! Gauss-Jordan elimination with full pivoting so that the pivot threshold and
//! determinant bookkeeping are under our control.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Largest remaining pivot magnitude below which a matrix is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("empty matrix")]
    Empty,
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("singular matrix (largest remaining pivot {pivot:.3e})")]
    Singular { pivot: f64 },
}

/// Output of a Gauss-Jordan elimination.
#[derive(Debug, Clone)]
pub struct Inversion {
    pub inverse: DMatrix<f64>,
    pub determinant: f64,
    /// Solution of `A x = b` when an augmented system was supplied.
    pub solution: Option<DVector<f64>>,
}

pub fn transpose(a: &DMatrix<f64>) -> Result<DMatrix<f64>, MatrixError> {
    if a.is_empty() {
        return Err(MatrixError::Empty);
    }
    Ok(a.transpose())
}

pub fn multiply(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>, MatrixError> {
    if a.is_empty() || b.is_empty() {
        return Err(MatrixError::Empty);
    }
    if a.ncols() != b.nrows() {
        return Err(MatrixError::DimensionMismatch {
            expected: (a.ncols(), b.ncols()),
            found: b.shape(),
        });
    }
    Ok(a * b)
}

pub fn multiply_vector(a: &DMatrix<f64>, v: &DVector<f64>) -> Result<DVector<f64>, MatrixError> {
    if a.is_empty() || v.is_empty() {
        return Err(MatrixError::Empty);
    }
    if a.ncols() != v.len() {
        return Err(MatrixError::DimensionMismatch {
            expected: (a.ncols(), 1),
            found: (v.len(), 1),
        });
    }
    Ok(a * v)
}

/// Invert a square matrix by Gauss-Jordan elimination with full pivoting.
pub fn inverse(a: &DMatrix<f64>) -> Result<Inversion, MatrixError> {
    gauss_jordan(a, None)
}

/// Invert the left `n×n` block of an `n×(n+1)` augmented matrix `[A | b]` and
/// solve `A x = b` in the same elimination.
pub fn solve_augmented(augmented: &DMatrix<f64>) -> Result<Inversion, MatrixError> {
    if augmented.is_empty() {
        return Err(MatrixError::Empty);
    }
    let n = augmented.nrows();
    if augmented.ncols() != n + 1 {
        return Err(MatrixError::DimensionMismatch {
            expected: (n, n + 1),
            found: augmented.shape(),
        });
    }
    let a = augmented.columns(0, n).into_owned();
    let b = augmented.column(n).into_owned();
    gauss_jordan(&a, Some(b))
}

fn gauss_jordan(a: &DMatrix<f64>, mut rhs: Option<DVector<f64>>) -> Result<Inversion, MatrixError> {
    if a.is_empty() {
        return Err(MatrixError::Empty);
    }
    let n = a.nrows();
    if a.ncols() != n {
        return Err(MatrixError::DimensionMismatch {
            expected: (n, n),
            found: a.shape(),
        });
    }

    let mut m = a.clone();
    // `pivoted[k]` marks columns (and, after the swap, rows) already used as a pivot.
    let mut pivoted = vec![false; n];
    let mut pivot_rows = vec![0usize; n];
    let mut pivot_cols = vec![0usize; n];
    let mut determinant = 1.0;

    for step in 0..n {
        let mut big = -1.0_f64;
        let mut irow = 0;
        let mut icol = 0;
        for j in 0..n {
            if pivoted[j] {
                continue;
            }
            for k in 0..n {
                if pivoted[k] {
                    continue;
                }
                let v = m[(j, k)].abs();
                if v > big {
                    big = v;
                    irow = j;
                    icol = k;
                }
            }
        }
        if !(big >= SINGULAR_EPSILON) {
            return Err(MatrixError::Singular { pivot: big.max(0.0) });
        }
        pivoted[icol] = true;

        // Move the pivot onto the diagonal. Column order is restored at the end.
        if irow != icol {
            m.swap_rows(irow, icol);
            if let Some(b) = rhs.as_mut() {
                b.swap_rows(irow, icol);
            }
            determinant = -determinant;
        }
        pivot_rows[step] = irow;
        pivot_cols[step] = icol;

        let pivot = m[(icol, icol)];
        determinant *= pivot;
        m[(icol, icol)] = 1.0;
        for l in 0..n {
            m[(icol, l)] /= pivot;
        }
        if let Some(b) = rhs.as_mut() {
            b[icol] /= pivot;
        }

        for row in 0..n {
            if row == icol {
                continue;
            }
            let factor = m[(row, icol)];
            m[(row, icol)] = 0.0;
            for l in 0..n {
                let v = m[(icol, l)];
                m[(row, l)] -= v * factor;
            }
            if let Some(b) = rhs.as_mut() {
                let v = b[icol];
                b[row] -= v * factor;
            }
        }
    }

    for step in (0..n).rev() {
        if pivot_rows[step] != pivot_cols[step] {
            m.swap_columns(pivot_rows[step], pivot_cols[step]);
        }
    }

    Ok(Inversion {
        inverse: m,
        determinant,
        solution: rhs,
    })
}

/// Stable ascending argsort.
///
/// Equal values keep their original order; NaN sorts after every number.
pub fn index_sort(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| {
        let (x, y) = (values[a], values[b]);
        match (x.is_nan(), y.is_nan()) {
            (false, false) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (true, true) => std::cmp::Ordering::Equal,
        }
    });
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_close(a: &DMatrix<f64>, b: &DMatrix<f64>, tol: f64) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < tol, "{x} vs {y}");
        }
    }

    #[test]
    fn transpose_rejects_empty() {
        let empty = DMatrix::<f64>::zeros(0, 3);
        assert_eq!(transpose(&empty).unwrap_err(), MatrixError::Empty);

        let a = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = transpose(&a).unwrap();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(2, 1)], 6.0);
    }

    #[test]
    fn multiply_checks_inner_dimension() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            multiply(&a, &b),
            Err(MatrixError::DimensionMismatch { .. })
        ));

        let v = DVector::from_row_slice(&[1.0, 1.0, 1.0]);
        let out = multiply_vector(&a, &v).unwrap();
        assert_eq!(out.as_slice(), &[6.0, 15.0]);

        let short = DVector::from_row_slice(&[1.0, 1.0]);
        assert!(multiply_vector(&a, &short).is_err());
    }

    #[test]
    fn inverse_of_known_matrix() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 7.0, 2.0, 3.0, 6.0, 1.0, 2.0, 5.0, 3.0]);
        let inv = inverse(&a).unwrap();
        assert!((inv.determinant - 9.0).abs() < 1e-10);
        assert_close(&(&inv.inverse * &a), &DMatrix::identity(3, 3), 1e-12);
    }

    #[test]
    fn determinant_tracks_row_interchange_parity() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let inv = inverse(&a).unwrap();
        assert!((inv.determinant + 1.0).abs() < 1e-12);
        assert_close(&inv.inverse, &a, 1e-12);
    }

    #[test]
    fn singular_matrix_is_an_explicit_error() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(inverse(&a), Err(MatrixError::Singular { .. })));

        let not_square = DMatrix::<f64>::zeros(2, 3);
        assert!(matches!(
            inverse(&not_square),
            Err(MatrixError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn augmented_system_is_solved_alongside_inverse() {
        // 2x + y = 5, x + 3y = 10  ->  x = 1, y = 3
        let aug = DMatrix::from_row_slice(2, 3, &[2.0, 1.0, 5.0, 1.0, 3.0, 10.0]);
        let out = solve_augmented(&aug).unwrap();
        let x = out.solution.unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
        assert!((out.determinant - 5.0).abs() < 1e-12);
    }

    #[test]
    fn random_inverse_round_trip() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=6 {
            // Diagonal dominance keeps the draw comfortably nonsingular.
            let a = DMatrix::from_fn(n, n, |i, j| {
                let v: f64 = rng.gen_range(-1.0..1.0);
                if i == j { v + n as f64 } else { v }
            });
            let inv = inverse(&a).unwrap();
            assert_close(&(&inv.inverse * &a), &DMatrix::identity(n, n), 1e-9);
        }
    }

    #[test]
    fn index_sort_is_stable() {
        let values = [3.0, 1.0, 2.0, 1.0, f64::NAN, 0.5];
        assert_eq!(index_sort(&values), vec![5, 1, 3, 2, 0, 4]);
        assert!(index_sort(&[]).is_empty());
    }
}
