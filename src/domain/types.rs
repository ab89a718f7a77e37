//! Shared domain types.
//!
//! These types are deliberately plain so they can be:
//!
//! - built from CSV files or synthetic generators
//! - passed to the fitter without copying
//! - printed, plotted, or serialized as a summary

use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::models::Model;

/// How supplied uncertainties are interpreted when reporting the covariance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum SigmaMode {
    /// Uncertainties are relative weights only; covariance is rescaled by the
    /// reduced chi-square of the fit.
    #[default]
    Relative,
    /// Uncertainties are true one-sigma measurement errors; covariance is
    /// reported as-is.
    Absolute,
}

impl SigmaMode {
    pub fn from_absolute_flag(absolute: bool) -> Self {
        if absolute {
            SigmaMode::Absolute
        } else {
            SigmaMode::Relative
        }
    }
}

/// Which built-in model to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelSpec {
    /// `y = a*x + b`
    Affine,
    /// `y = a*x` (forced through the origin)
    Origin,
    /// `y = c0 + c1*t + c2*t^2`
    Quadratic,
    /// `y = y0 + v0*t - g*t^2/2`
    FreeFall,
    /// Polynomial of arbitrary degree (`--degree`).
    Poly,
}

/// A single measurement: independent value, observed value, optional 1-sigma error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub sigma: Option<f64>,
}

/// An ordered set of measurements.
///
/// Stored column-wise because that is how the fitter and the CSV layer consume
/// it. Lengths are not enforced here; the fitter validates them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleSet {
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub sigma: Option<Vec<f64>>,
}

impl SampleSet {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            x,
            y,
            sigma: None,
        }
    }

    pub fn with_sigma(mut self, sigma: Vec<f64>) -> Self {
        self.sigma = Some(sigma);
        self
    }

    /// Attach the same uncertainty to every sample.
    pub fn with_uniform_sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(vec![sigma; self.x.len()]);
        self
    }

    pub fn with_labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn sigma(&self) -> Option<&[f64]> {
        self.sigma.as_deref()
    }

    pub fn get(&self, i: usize) -> Option<Sample> {
        let x = *self.x.get(i)?;
        let y = *self.y.get(i)?;
        let sigma = self.sigma.as_ref().and_then(|s| s.get(i).copied());
        Some(Sample { x, y, sigma })
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.x.len().min(self.y.len())).filter_map(move |i| self.get(i))
    }

    pub fn stats(&self) -> Option<DatasetStats> {
        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;

        for s in self.iter() {
            x_min = x_min.min(s.x);
            x_max = x_max.max(s.x);
            y_min = y_min.min(s.y);
            y_max = y_max.max(s.y);
        }

        if !x_min.is_finite() || !x_max.is_finite() || !y_min.is_finite() || !y_max.is_finite() {
            return None;
        }

        Some(DatasetStats {
            n_points: self.len(),
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }
}

/// Summary stats about a sample set.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_points: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Output of a single weighted least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Human-readable model label (e.g. `"y = a*x + b"`).
    pub model: String,
    pub param_names: Vec<String>,
    /// Best-fit parameter estimates.
    pub params: Vec<f64>,
    /// Parameter covariance, `params.len()` square.
    pub covariance: DMatrix<f64>,
    /// Weighted sum of squared residuals at the optimum.
    pub chi_square: f64,
    pub n_samples: usize,
    pub sigma_mode: SigmaMode,
    /// Levenberg–Marquardt iterations used (accepted + rejected steps).
    pub iterations: usize,
}

impl FitResult {
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn dof(&self) -> usize {
        self.n_samples.saturating_sub(self.params.len())
    }

    /// `χ² / (N - P)`, or `None` when there are no degrees of freedom.
    pub fn reduced_chi_square(&self) -> Option<f64> {
        let dof = self.dof();
        if dof == 0 {
            None
        } else {
            Some(self.chi_square / dof as f64)
        }
    }

    /// One-sigma parameter uncertainties (`sqrt(diag(covariance))`).
    pub fn std_errors(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().map(|v| v.sqrt()).collect()
    }

    /// Correlation matrix derived from the covariance.
    ///
    /// Entries with a zero or non-finite variance on either side are `NaN`.
    pub fn correlation(&self) -> DMatrix<f64> {
        let p = self.params.len();
        let se = self.std_errors();
        DMatrix::from_fn(p, p, |i, j| {
            let denom = se[i] * se[j];
            if denom > 0.0 && denom.is_finite() {
                self.covariance[(i, j)] / denom
            } else {
                f64::NAN
            }
        })
    }

    /// Look up an estimate by parameter name.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.param_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.params[i])
    }

    /// Bayesian information criterion for weighted least squares: `χ² + P ln N`.
    pub fn bic(&self) -> f64 {
        let n = self.n_samples.max(1) as f64;
        self.chi_square + self.params.len() as f64 * n.ln()
    }

    /// Evaluate the fitted model at `x`.
    pub fn predict(&self, model: &dyn Model, x: f64) -> f64 {
        model.eval(x, &self.params)
    }
}

/// One parameter estimate in a serialized summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamEstimate {
    pub name: String,
    pub value: f64,
    pub std_error: f64,
}

/// Printable, serializable view of a `FitResult` (for `--json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitSummary {
    pub model: String,
    pub sigma_mode: SigmaMode,
    pub n_samples: usize,
    pub dof: usize,
    pub chi_square: f64,
    pub reduced_chi_square: Option<f64>,
    pub iterations: usize,
    pub params: Vec<ParamEstimate>,
    pub covariance: Vec<Vec<f64>>,
}

impl From<&FitResult> for FitSummary {
    fn from(fit: &FitResult) -> Self {
        let se = fit.std_errors();
        let params = fit
            .param_names
            .iter()
            .zip(fit.params.iter())
            .zip(se.iter())
            .map(|((name, &value), &std_error)| ParamEstimate {
                name: name.clone(),
                value,
                std_error,
            })
            .collect();
        let covariance = fit
            .covariance
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();

        FitSummary {
            model: fit.model.clone(),
            sigma_mode: fit.sigma_mode,
            n_samples: fit.n_samples,
            dof: fit.dof(),
            chi_square: fit.chi_square,
            reduced_chi_square: fit.reduced_chi_square(),
            iterations: fit.iterations,
            params,
            covariance,
        }
    }
}

/// Synthetic dataset settings, derived from `labfit generate` flags.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub model: ModelSpec,
    pub degree: usize,
    /// Ground-truth parameters, in the model's parameter order.
    pub truth: Vec<f64>,
    pub x_start: f64,
    pub x_end: f64,
    pub count: usize,
    /// One-sigma Gaussian noise added to each observed value (0 = exact data).
    pub sigma: f64,
    pub seed: u64,
    pub x_name: String,
    pub y_name: String,
    /// Write the per-sample uncertainty as a third column.
    pub with_sigma: bool,
    pub output: PathBuf,
}

/// A fit run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: PathBuf,
    pub x_col: Option<String>,
    pub y_col: Option<String>,
    pub sigma_col: Option<String>,
    /// Constant uncertainty applied to every sample when no column is given.
    pub sigma: Option<f64>,

    pub models: Vec<ModelSpec>,
    pub degree: usize,
    pub sigma_mode: SigmaMode,
    pub initial_guess: Option<Vec<f64>>,
    pub max_iterations: usize,
    pub ftol: f64,

    /// Known reference values to compare estimates against (`name=value`).
    pub expect: Vec<(String, f64)>,

    pub top_n: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub svg: Option<PathBuf>,
    pub export_residuals: Option<PathBuf>,
    pub json: bool,
}
