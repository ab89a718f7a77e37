//! Linear least-squares building blocks.
//!
//! The Levenberg–Marquardt loop needs two dense linear-algebra operations on
//! small matrices (a handful of columns):
//!
//! - solve the damped step `[J; √λ·D] δ ≈ [r; 0]` in the least-squares sense
//! - invert `JᵀJ` at the optimum to get the parameter covariance
//!
//! Implementation choices:
//! - Both go through SVD. The step is solved on the augmented tall matrix, not
//!   via normal equations. (Nalgebra's `QR::solve` is intended for square
//!   systems and will panic for non-square matrices.)
//! - The covariance is `V·S⁻²·Vᵀ` from the SVD of `J`; a singular value that is
//!   negligible relative to the largest one means a parameter is not
//!   identifiable from the data, and no covariance is returned.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    if !(s_max.is_finite() && s_max > 0.0) {
        return None;
    }

    // Try progressively looser (relative) tolerances if strict solve fails.
    for &rel in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, rel * s_max) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Parameter covariance `(JᵀJ)⁻¹` from a (weighted) Jacobian.
///
/// Returns `None` when `J` is rank deficient at machine precision, i.e. when
/// some combination of parameters is not constrained by the data.
pub fn covariance_from_jacobian(j: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let (n, p) = j.shape();
    if n < p || p == 0 {
        return None;
    }

    let svd = j.clone().svd(false, true);
    let v_t = svd.v_t?;
    let s = &svd.singular_values;
    let s_max = s.max();
    if !(s_max.is_finite() && s_max > 0.0) {
        return None;
    }

    let threshold = f64::EPSILON * n.max(p) as f64 * s_max;
    if s.iter().any(|&sv| sv <= threshold) {
        return None;
    }

    let inv_s2 = DMatrix::from_diagonal(&s.map(|sv| 1.0 / (sv * sv)));
    let cov = v_t.transpose() * inv_s2 * &v_t;
    if cov.iter().all(|v| v.is_finite()) {
        Some(cov)
    } else {
        None
    }
}
