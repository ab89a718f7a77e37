//! Reporting utilities: residuals, pulls, and formatted terminal output.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::domain::{FitResult, FitSummary, SampleSet};
use crate::error::AppError;
use crate::fit::selection::FitSelection;
use crate::models::Model;

/// Fitted value and residual for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResidual {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub sigma: Option<f64>,
    pub y_fit: f64,
    /// `y - y_fit`
    pub residual: f64,
    /// Residual in units of the sample's uncertainty (unit weight if absent).
    pub pull: f64,
}

/// Compute fitted values, residuals, and pulls for each sample.
pub fn compute_residuals(
    samples: &SampleSet,
    model: &dyn Model,
    fit: &FitResult,
) -> Result<Vec<SampleResidual>, AppError> {
    let mut out = Vec::with_capacity(samples.len());
    for (index, s) in samples.iter().enumerate() {
        let y_fit = fit.predict(model, s.x);
        if !y_fit.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        let residual = s.y - y_fit;
        out.push(SampleResidual {
            index,
            x: s.x,
            y: s.y,
            sigma: s.sigma,
            y_fit,
            residual,
            pull: residual / s.sigma.unwrap_or(1.0),
        });
    }
    Ok(out)
}

/// The `top_n` samples with the largest `|pull|`, largest first.
pub fn largest_pulls(residuals: &[SampleResidual], top_n: usize) -> Vec<SampleResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| {
        b.pull
            .abs()
            .partial_cmp(&a.pull.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    sorted.truncate(top_n);
    sorted
}

/// One candidate in a serialized comparison (for `--json`).
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    pub name: String,
    pub param_count: usize,
    pub bic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serializable view of a `FitSelection`.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSummary {
    pub chosen: String,
    pub fits: Vec<ComparisonEntry>,
}

impl From<&FitSelection> for ComparisonSummary {
    fn from(selection: &FitSelection) -> Self {
        let fits = selection
            .fits
            .iter()
            .map(|f| ComparisonEntry {
                name: f.name.clone(),
                param_count: f.param_count,
                bic: f.bic(),
                fit: f.result.as_ref().ok().map(FitSummary::from),
                error: f.result.as_ref().err().map(ToString::to_string),
            })
            .collect();
        ComparisonSummary {
            chosen: selection.best_fit().name.clone(),
            fits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SigmaMode;
    use crate::models::Affine;
    use nalgebra::DMatrix;

    fn line_fit() -> FitResult {
        FitResult {
            model: "y = a*x + b".to_string(),
            param_names: vec!["a".to_string(), "b".to_string()],
            params: vec![2.0, 1.0],
            covariance: DMatrix::identity(2, 2),
            chi_square: 0.0,
            n_samples: 3,
            sigma_mode: SigmaMode::Absolute,
            iterations: 1,
        }
    }

    #[test]
    fn compute_residuals_basic() {
        let samples = SampleSet::new(vec![0.0, 1.0, 2.0], vec![1.0, 3.5, 4.0]).with_uniform_sigma(0.5);
        let residuals = compute_residuals(&samples, &Affine, &line_fit()).unwrap();

        assert_eq!(residuals.len(), 3);
        assert!((residuals[0].residual - 0.0).abs() < 1e-12);
        assert!((residuals[1].residual - 0.5).abs() < 1e-12);
        assert!((residuals[1].pull - 1.0).abs() < 1e-12);
        assert!((residuals[2].pull + 2.0).abs() < 1e-12);
    }

    #[test]
    fn largest_pulls_orders_by_magnitude() {
        let samples = SampleSet::new(vec![0.0, 1.0, 2.0], vec![1.0, 3.5, 4.0]).with_uniform_sigma(0.5);
        let residuals = compute_residuals(&samples, &Affine, &line_fit()).unwrap();

        let top = largest_pulls(&residuals, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].index, 2);
        assert_eq!(top[1].index, 1);
        assert!(largest_pulls(&residuals, 0).is_empty());
    }

    #[test]
    fn comparison_summary_serializes_failures() {
        use crate::error::FitError;
        use crate::fit::selection::ModelFit;

        let selection = FitSelection {
            best: 0,
            fits: vec![
                ModelFit {
                    name: "affine".to_string(),
                    param_count: 2,
                    result: Ok(line_fit()),
                },
                ModelFit {
                    name: "poly".to_string(),
                    param_count: 5,
                    result: Err(FitError::InsufficientData { samples: 3, params: 5 }),
                },
            ],
        };

        let json = serde_json::to_value(ComparisonSummary::from(&selection)).unwrap();
        assert_eq!(json["chosen"], "affine");
        assert_eq!(json["fits"][0]["fit"]["params"][0]["name"], "a");
        assert!(json["fits"][1].get("fit").is_none());
        assert!(json["fits"][1]["error"].as_str().unwrap().contains("insufficient data"));
    }
}
