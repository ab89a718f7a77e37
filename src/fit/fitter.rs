//! Weighted nonlinear least squares for a single model.
//!
//! Given:
//! - independent values `x_i`
//! - observed values `y_i`
//! - optional one-sigma uncertainties `σ_i` (uniform weight when absent)
//! - a model `f(x; p)`
//!
//! we minimize
//!
//! ```text
//! χ²(p) = Σ [(y_i - f(x_i; p)) / σ_i]²
//! ```
//!
//! with Levenberg–Marquardt, then report the covariance `(JᵀJ)⁻¹` of the
//! weighted Jacobian at the optimum, rescaled by the reduced χ² unless the
//! uncertainties are declared absolute.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace, warn};

use crate::domain::{FitResult, SampleSet, SigmaMode};
use crate::error::FitError;
use crate::math::{covariance_from_jacobian, solve_least_squares, weighted_jacobian};
use crate::models::Model;

pub const DEFAULT_MAX_ITERATIONS: usize = 200;
pub const DEFAULT_FTOL: f64 = 1e-10;
pub const DEFAULT_XTOL: f64 = 1e-10;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;

/// Solver options for one fit.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Starting parameters. Defaults to `Model::initial_guess()`.
    pub initial_guess: Option<Vec<f64>>,
    /// Whether `σ` are absolute errors or relative weights.
    pub sigma_mode: SigmaMode,
    /// Upper bound on LM iterations (accepted and rejected steps).
    pub max_iterations: usize,
    /// Converge when an accepted step lowers χ² by at most `ftol · χ²`.
    pub ftol: f64,
    /// Converge when `‖δ‖ ≤ xtol · (‖p‖ + xtol)`.
    pub xtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            initial_guess: None,
            sigma_mode: SigmaMode::Relative,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            ftol: DEFAULT_FTOL,
            xtol: DEFAULT_XTOL,
        }
    }
}

impl FitOptions {
    pub fn with_sigma_mode(mut self, mode: SigmaMode) -> Self {
        self.sigma_mode = mode;
        self
    }

    pub fn with_initial_guess(mut self, guess: Vec<f64>) -> Self {
        self.initial_guess = Some(guess);
        self
    }
}

/// Fit `model` to a sample set (convenience wrapper over [`curve_fit`]).
pub fn fit_samples(
    model: &dyn Model,
    samples: &SampleSet,
    opts: &FitOptions,
) -> Result<FitResult, FitError> {
    curve_fit(model, &samples.x, &samples.y, samples.sigma(), opts)
}

/// Weighted least-squares fit of `model` to `(x, y)`.
///
/// All input validation happens before any model evaluation.
pub fn curve_fit(
    model: &dyn Model,
    x: &[f64],
    y: &[f64],
    sigma: Option<&[f64]>,
    opts: &FitOptions,
) -> Result<FitResult, FitError> {
    let p0 = validate_inputs(model, x, y, sigma, opts)?;
    let n = x.len();
    let p = p0.len();

    let sigma: Vec<f64> = match sigma {
        Some(s) => s.to_vec(),
        None => vec![1.0; n],
    };

    let mut params = p0;
    let mut resid = weighted_residuals(model, x, y, &sigma, &params);
    let mut chi2 = resid.norm_squared();
    if !chi2.is_finite() {
        return Err(FitError::Convergence(
            "model is not finite at the initial guess".to_string(),
        ));
    }

    let mut jac = weighted_jacobian(model, x, &params, &sigma);
    let mut lambda = LAMBDA_INIT;
    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < opts.max_iterations {
        iterations += 1;

        let Some(delta) = damped_step(&jac, &resid, lambda) else {
            lambda *= 10.0;
            trace!(iterations, lambda, "step solve failed; increasing damping");
            if lambda > LAMBDA_MAX {
                break;
            }
            continue;
        };

        let param_norm = params.iter().map(|v| v * v).sum::<f64>().sqrt();
        let small_step = delta.norm() <= opts.xtol * (param_norm + opts.xtol);

        let trial: Vec<f64> = params
            .iter()
            .zip(delta.iter())
            .map(|(p, d)| p + d)
            .collect();
        let trial_resid = weighted_residuals(model, x, y, &sigma, &trial);
        let trial_chi2 = trial_resid.norm_squared();

        if trial_chi2.is_finite() && trial_chi2 <= chi2 {
            let prev_chi2 = chi2;
            params = trial;
            resid = trial_resid;
            chi2 = trial_chi2;
            jac = weighted_jacobian(model, x, &params, &sigma);
            lambda = (lambda * 0.1).max(LAMBDA_MIN);
            trace!(iterations, chi2, lambda, "step accepted");

            if prev_chi2 - chi2 <= opts.ftol * prev_chi2 || small_step {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            trace!(iterations, trial_chi2, lambda, "step rejected");

            // No descent is possible from here at working precision.
            if small_step {
                converged = true;
                break;
            }
            if lambda > LAMBDA_MAX {
                break;
            }
        }
    }

    if !converged {
        return Err(FitError::Convergence(format!(
            "no convergence after {iterations} iteration(s) (chi2={chi2:.6e})"
        )));
    }

    let covariance = covariance_from_jacobian(&jac).ok_or_else(|| {
        FitError::Convergence(
            "singular Jacobian at the optimum; parameters are not identifiable from the data"
                .to_string(),
        )
    })?;

    let dof = n - p;
    let covariance = match opts.sigma_mode {
        SigmaMode::Absolute => covariance,
        SigmaMode::Relative if dof > 0 => covariance * (chi2 / dof as f64),
        SigmaMode::Relative => {
            warn!(
                samples = n,
                params = p,
                "no degrees of freedom; covariance cannot be rescaled and is reported as infinite"
            );
            DMatrix::from_element(p, p, f64::INFINITY)
        }
    };

    debug!(
        model = %model.label(),
        iterations,
        chi2,
        dof,
        "fit converged"
    );

    Ok(FitResult {
        model: model.label(),
        param_names: model.param_names(),
        params,
        covariance,
        chi_square: chi2,
        n_samples: n,
        sigma_mode: opts.sigma_mode,
        iterations,
    })
}

fn validate_inputs(
    model: &dyn Model,
    x: &[f64],
    y: &[f64],
    sigma: Option<&[f64]>,
    opts: &FitOptions,
) -> Result<Vec<f64>, FitError> {
    let n = x.len();
    if y.len() != n {
        return Err(FitError::DimensionMismatch {
            what: "observed values",
            expected: n,
            actual: y.len(),
        });
    }

    if let Some(s) = sigma {
        if s.len() != n {
            return Err(FitError::DimensionMismatch {
                what: "uncertainties",
                expected: n,
                actual: s.len(),
            });
        }
        if let Some((index, &value)) = s
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            return Err(FitError::NonPositiveUncertainty { index, value });
        }
    }

    if let Some(index) = x.iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteInput {
            what: "independent",
            index,
        });
    }
    if let Some(index) = y.iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteInput {
            what: "observed",
            index,
        });
    }

    let p = model.param_len();
    if p == 0 {
        return Err(FitError::DimensionMismatch {
            what: "model parameters",
            expected: 1,
            actual: 0,
        });
    }
    if n < p {
        return Err(FitError::InsufficientData {
            samples: n,
            params: p,
        });
    }

    let guess = opts
        .initial_guess
        .clone()
        .unwrap_or_else(|| model.initial_guess());
    if guess.len() != p {
        return Err(FitError::DimensionMismatch {
            what: "initial guess",
            expected: p,
            actual: guess.len(),
        });
    }
    if let Some(index) = guess.iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteInput {
            what: "initial guess",
            index,
        });
    }

    Ok(guess)
}

fn weighted_residuals(
    model: &dyn Model,
    x: &[f64],
    y: &[f64],
    sigma: &[f64],
    params: &[f64],
) -> DVector<f64> {
    DVector::from_iterator(
        x.len(),
        x.iter()
            .zip(y.iter())
            .zip(sigma.iter())
            .map(|((&xi, &yi), &si)| (yi - model.eval(xi, params)) / si),
    )
}

/// Solve `[J; √λ·D] δ ≈ [r; 0]`, with `D` the Jacobian column norms.
fn damped_step(jac: &DMatrix<f64>, resid: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let (n, p) = jac.shape();
    let sqrt_lambda = lambda.sqrt();

    let mut a = DMatrix::<f64>::zeros(n + p, p);
    a.rows_mut(0, n).copy_from(jac);
    for j in 0..p {
        let norm = jac.column(j).norm();
        // A parameter with no influence at this point still gets unit damping.
        let scale = if norm > 0.0 && norm.is_finite() { norm } else { 1.0 };
        a[(n + j, j)] = sqrt_lambda * scale;
    }

    let mut b = DVector::<f64>::zeros(n + p);
    b.rows_mut(0, n).copy_from(resid);

    solve_least_squares(&a, &b)
}
