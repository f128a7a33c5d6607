//! Critical values for the coefficient t-tests.
//!
//! The search only needs one number per fit: the two-sided Student-T critical
//! value at the configured confidence for the fit's residual degrees of freedom.
//! Callers with their own tables can implement `StatisticalTables`; the default
//! `ApproxStudentT` is exact for 1 and 2 degrees of freedom and uses a
//! Cornish-Fisher expansion elsewhere (error well under 0.01 for dof >= 3).

pub trait StatisticalTables {
    /// Two-sided critical t value: `P(|T| > t) = 1 - confidence`.
    fn critical_t(&self, confidence: f64, dof: usize) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxStudentT;

impl StatisticalTables for ApproxStudentT {
    fn critical_t(&self, confidence: f64, dof: usize) -> f64 {
        let p = 1.0 - (1.0 - confidence) / 2.0;
        student_t_quantile(p, dof)
    }
}

/// Upper quantile of Student's t distribution with `dof` degrees of freedom.
pub fn student_t_quantile(p: f64, dof: usize) -> f64 {
    if !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }
    match dof {
        0 => f64::NAN,
        1 => (std::f64::consts::PI * (p - 0.5)).tan(),
        2 => (2.0 * p - 1.0) / (2.0 * p * (1.0 - p)).sqrt(),
        _ => {
            let z = normal_quantile(p);
            let nu = dof as f64;
            let z2 = z * z;
            let z3 = z2 * z;
            let z5 = z3 * z2;
            let z7 = z5 * z2;
            let z9 = z7 * z2;
            z + (z3 + z) / (4.0 * nu)
                + (5.0 * z5 + 16.0 * z3 + 3.0 * z) / (96.0 * nu * nu)
                + (3.0 * z7 + 19.0 * z5 + 17.0 * z3 - 15.0 * z) / (384.0 * nu.powi(3))
                + (79.0 * z9 + 776.0 * z7 + 1482.0 * z5 - 1920.0 * z3 - 945.0 * z) / (92160.0 * nu.powi(4))
        }
    }
}

/// Inverse of the standard normal CDF (Acklam's rational approximation).
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
    ];
    const P_LOW: f64 = 0.02425;

    if !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_quantile_known_points() {
        assert!(normal_quantile(0.5).abs() < 1e-9);
        assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-5);
        assert!((normal_quantile(0.01) + 2.326348).abs() < 1e-5);
    }

    #[test]
    fn two_sided_critical_values_match_tables() {
        let t = ApproxStudentT;
        // (confidence, dof, table value)
        let cases = [
            (0.95, 1, 12.706),
            (0.95, 2, 4.303),
            (0.95, 4, 2.776),
            (0.95, 10, 2.228),
            (0.95, 30, 2.042),
            (0.99, 10, 3.169),
            (0.90, 20, 1.725),
        ];
        for (conf, dof, expected) in cases {
            let got = t.critical_t(conf, dof);
            assert!((got - expected).abs() < 0.01, "conf={conf} dof={dof}: {got} vs {expected}");
        }
        assert!((t.critical_t(0.95, 100_000) - 1.96).abs() < 1e-3);
    }

    #[test]
    fn invalid_inputs_are_nan() {
        assert!(student_t_quantile(1.0, 5).is_nan());
        assert!(student_t_quantile(0.9, 0).is_nan());
    }
}
