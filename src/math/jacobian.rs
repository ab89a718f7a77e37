//! Jacobian of a model with respect to its parameters.
//!
//! Analytic partials are used when the model provides them; otherwise a
//! forward difference with step `h_j = √ε · max(|p_j|, 1)` (signed like `p_j`)
//! is taken. Rows are divided by the per-sample uncertainty so the result is
//! the Jacobian of the *weighted* residual vector.

use nalgebra::DMatrix;

use crate::models::Model;

/// Forward-difference partials of `model` at `x`.
pub fn numeric_gradient(model: &dyn Model, x: f64, params: &[f64], out: &mut [f64]) {
    let f0 = model.eval(x, params);
    let mut shifted = params.to_vec();

    for (j, slot) in out.iter_mut().enumerate().take(params.len()) {
        let p = params[j];
        let sign = if p < 0.0 { -1.0 } else { 1.0 };
        let h = f64::EPSILON.sqrt() * p.abs().max(1.0) * sign;

        shifted[j] = p + h;
        // Use the representable step actually taken.
        let dh = shifted[j] - p;
        *slot = (model.eval(x, &shifted) - f0) / dh;
        shifted[j] = p;
    }
}

/// Weighted Jacobian `J[i, j] = (∂f/∂p_j)(x_i) / σ_i`.
pub fn weighted_jacobian(
    model: &dyn Model,
    xs: &[f64],
    params: &[f64],
    sigma: &[f64],
) -> DMatrix<f64> {
    let n = xs.len();
    let p = params.len();
    let mut jac = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];

    for i in 0..n {
        if !model.gradient(xs[i], params, &mut row) {
            numeric_gradient(model, xs[i], params, &mut row);
        }
        let inv_s = 1.0 / sigma[i];
        for j in 0..p {
            jac[(i, j)] = row[j] * inv_s;
        }
    }

    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FnModel, FreeFall};

    #[test]
    fn numeric_gradient_matches_analytic() {
        let params = [1.5, 0.2, 9.81];
        for &t in &[0.0, 0.25, 0.6] {
            let mut analytic = [0.0; 3];
            let mut numeric = [0.0; 3];
            assert!(FreeFall.gradient(t, &params, &mut analytic));
            numeric_gradient(&FreeFall, t, &params, &mut numeric);
            for (a, b) in analytic.iter().zip(numeric.iter()) {
                assert!((a - b).abs() < 1e-6, "t={t}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn weighted_jacobian_scales_rows() {
        let m = FnModel::new("y = a*x^2", &["a"], |x, p| p[0] * x * x);
        let jac = weighted_jacobian(&m, &[1.0, 2.0], &[3.0], &[0.5, 2.0]);
        assert!((jac[(0, 0)] - 2.0).abs() < 1e-6);
        assert!((jac[(1, 0)] - 2.0).abs() < 1e-6);
    }
}
