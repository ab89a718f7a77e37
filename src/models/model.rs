//! The model capability used by the fitter.
//!
//! The fitter relies on two primitive operations:
//! - predict `y(x)` given a parameter vector (for residuals/plots)
//! - optionally, the partial derivatives `∂y/∂p_j` at `x` (for the Jacobian)
//!
//! Models without analytic partials get a finite-difference Jacobian.

use crate::domain::ModelSpec;
use crate::models::{Affine, FreeFall, Polynomial, Proportional};

/// A parametric model `y = f(x; p)` with a fixed parameter count.
pub trait Model: Send + Sync {
    /// Human-readable form, e.g. `"y = a*x + b"`.
    fn label(&self) -> String;

    /// Parameter names, in parameter-vector order.
    fn param_names(&self) -> Vec<String>;

    fn param_len(&self) -> usize {
        self.param_names().len()
    }

    /// Evaluate the model at `x`.
    ///
    /// `params` always has length `param_len()` when called by the fitter.
    fn eval(&self, x: f64, params: &[f64]) -> f64;

    /// Fill `out` with `∂f/∂p_j` at `x`.
    ///
    /// Returns `false` when the model has no analytic partials; `out` is then
    /// left untouched and the caller falls back to finite differences.
    fn gradient(&self, _x: f64, _params: &[f64], _out: &mut [f64]) -> bool {
        false
    }

    /// Starting point used when the caller supplies none.
    fn initial_guess(&self) -> Vec<f64> {
        vec![1.0; self.param_len()]
    }
}

/// A model backed by an arbitrary closure.
pub struct FnModel<F> {
    label: String,
    names: Vec<String>,
    guess: Option<Vec<f64>>,
    f: F,
}

impl<F> FnModel<F> {
    pub fn new(label: impl Into<String>, names: &[&str], f: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync,
    {
        Self {
            label: label.into(),
            names: names.iter().map(|s| s.to_string()).collect(),
            guess: None,
            f,
        }
    }

    pub fn with_initial_guess(mut self, guess: Vec<f64>) -> Self {
        self.guess = Some(guess);
        self
    }
}

impl<F> Model for FnModel<F>
where
    F: Fn(f64, &[f64]) -> f64 + Send + Sync,
{
    fn label(&self) -> String {
        self.label.clone()
    }

    fn param_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        (self.f)(x, params)
    }

    fn initial_guess(&self) -> Vec<f64> {
        self.guess
            .clone()
            .unwrap_or_else(|| vec![1.0; self.names.len()])
    }
}

impl ModelSpec {
    /// Instantiate the built-in model. `degree` is only used by `Poly`.
    pub fn build(self, degree: usize) -> Box<dyn Model> {
        match self {
            ModelSpec::Affine => Box::new(Affine),
            ModelSpec::Origin => Box::new(Proportional),
            ModelSpec::Quadratic => Box::new(Polynomial::quadratic()),
            ModelSpec::FreeFall => Box::new(FreeFall),
            ModelSpec::Poly => Box::new(Polynomial::new(degree)),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelSpec::Affine => "affine",
            ModelSpec::Origin => "origin",
            ModelSpec::Quadratic => "quadratic",
            ModelSpec::FreeFall => "free-fall",
            ModelSpec::Poly => "poly",
        }
    }
}
