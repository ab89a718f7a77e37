//! Model comparison on a shared sample set using BIC.
//!
//! Each candidate model is fitted independently (in parallel) and scored with
//!
//! ```text
//! BIC = χ² + k · ln(n)
//! ```
//!
//! Selection rules:
//! 1. Failed fits are kept for diagnostics but never selected
//! 2. Choose the model with minimum BIC
//! 3. If ΔBIC < 2 between the best and a simpler model, pick the simpler model

use rayon::prelude::*;
use tracing::info;

use crate::domain::{FitResult, SampleSet};
use crate::error::FitError;
use crate::fit::fitter::{FitOptions, fit_samples};
use crate::models::Model;

/// Models within this BIC distance of the best are considered equivalent.
const BIC_EQUIVALENCE: f64 = 2.0;

/// Outcome of fitting one candidate model.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub name: String,
    pub param_count: usize,
    pub result: Result<FitResult, FitError>,
}

impl ModelFit {
    pub fn bic(&self) -> Option<f64> {
        self.result.as_ref().ok().map(FitResult::bic)
    }
}

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    /// Index into `fits` of the selected model.
    pub best: usize,
    /// Every attempted model, in input order.
    pub fits: Vec<ModelFit>,
}

impl FitSelection {
    pub fn best_fit(&self) -> &ModelFit {
        &self.fits[self.best]
    }
}

/// Fit every model to the same samples.
///
/// Fits share nothing but a read-only view of `samples`, so they run in
/// parallel; results come back in input order.
pub fn fit_models(
    models: &[(String, Box<dyn Model>)],
    samples: &SampleSet,
    opts: &FitOptions,
) -> Vec<ModelFit> {
    models
        .par_iter()
        .map(|(name, model)| ModelFit {
            name: name.clone(),
            param_count: model.param_len(),
            result: fit_samples(model.as_ref(), samples, opts),
        })
        .collect()
}

/// Fit every model and select the best one by BIC.
pub fn fit_and_select(
    models: &[(String, Box<dyn Model>)],
    samples: &SampleSet,
    opts: &FitOptions,
) -> Result<FitSelection, FitError> {
    let fits = fit_models(models, samples, opts);
    let best = match select_by_bic(&fits) {
        Some(best) => best,
        None => {
            // Surface the first failure; every fit failed.
            return Err(fits
                .into_iter()
                .find_map(|f| f.result.err())
                .unwrap_or_else(|| FitError::Convergence("no candidate models".to_string())));
        }
    };

    info!(model = %fits[best].name, "selected model by BIC");
    Ok(FitSelection { best, fits })
}

/// Index of the preferred fit, or `None` if no fit succeeded.
pub fn select_by_bic(fits: &[ModelFit]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, f) in fits.iter().enumerate() {
        let Some(bic) = f.bic().filter(|b| b.is_finite()) else {
            continue;
        };
        match best {
            Some((_, b)) if bic >= b => {}
            _ => best = Some((idx, bic)),
        }
    }
    let (best_idx, best_bic) = best?;

    // Among statistically indistinguishable fits: fewest parameters, then lowest BIC.
    let mut chosen = (best_idx, fits[best_idx].param_count, best_bic);
    for (idx, f) in fits.iter().enumerate() {
        let Some(bic) = f.bic().filter(|b| b.is_finite()) else {
            continue;
        };
        if bic - best_bic >= BIC_EQUIVALENCE {
            continue;
        }
        let (_, count, chosen_bic) = chosen;
        if f.param_count < count || (f.param_count == count && bic < chosen_bic) {
            chosen = (idx, f.param_count, bic);
        }
    }

    Some(chosen.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SigmaMode;
    use crate::math::linspace;
    use crate::models::{Affine, Polynomial, Proportional};

    fn candidates() -> Vec<(String, Box<dyn Model>)> {
        vec![
            ("origin".to_string(), Box::new(Proportional) as Box<dyn Model>),
            ("affine".to_string(), Box::new(Affine)),
            ("quadratic".to_string(), Box::new(Polynomial::quadratic())),
        ]
    }

    fn line_samples(b: f64) -> SampleSet {
        let x = linspace(0.0, 0.05, 12);
        let y = x.iter().map(|&xi| 220.0 * xi + b).collect();
        SampleSet::new(x, y).with_uniform_sigma(0.12)
    }

    #[test]
    fn prefers_origin_model_for_proportional_data() {
        let opts = FitOptions::default().with_sigma_mode(SigmaMode::Absolute);
        let sel = fit_and_select(&candidates(), &line_samples(0.0), &opts).unwrap();
        assert_eq!(sel.fits.len(), 3);
        assert_eq!(sel.best_fit().name, "origin");
    }

    #[test]
    fn prefers_intercept_model_for_offset_data() {
        let opts = FitOptions::default().with_sigma_mode(SigmaMode::Absolute);
        let sel = fit_and_select(&candidates(), &line_samples(0.2), &opts).unwrap();
        assert_eq!(sel.best_fit().name, "affine");

        let origin_bic = sel.fits[0].bic().unwrap();
        let affine_bic = sel.fits[1].bic().unwrap();
        assert!(origin_bic - affine_bic > 2.0);
    }

    #[test]
    fn failed_fits_are_kept_but_not_selected() {
        // Two samples: quadratic is underdetermined.
        let samples = SampleSet::new(vec![0.0, 1.0], vec![1.0, 3.0]);
        let sel = fit_and_select(&candidates(), &samples, &FitOptions::default()).unwrap();
        assert!(matches!(
            sel.fits[2].result,
            Err(FitError::InsufficientData { samples: 2, params: 3 })
        ));
        assert_ne!(sel.best, 2);
    }

    fn scored(name: &str, param_count: usize, chi_square: f64) -> ModelFit {
        ModelFit {
            name: name.to_string(),
            param_count,
            result: Ok(FitResult {
                model: name.to_string(),
                param_names: (0..param_count).map(|i| format!("p{i}")).collect(),
                params: vec![1.0; param_count],
                covariance: nalgebra::DMatrix::identity(param_count, param_count),
                chi_square,
                n_samples: 10,
                sigma_mode: SigmaMode::Absolute,
                iterations: 1,
            }),
        }
    }

    #[test]
    fn equally_simple_models_fall_back_to_lowest_bic() {
        // BIC with n = 10: a = 12.30, b = 11.30, c = 10.61; a and b are within 2 of c.
        let fits = vec![scored("a", 1, 10.0), scored("b", 1, 9.0), scored("c", 2, 6.0)];
        assert_eq!(select_by_bic(&fits), Some(1));

        // Outside the equivalence window the lower BIC wins regardless of size.
        let fits = vec![scored("a", 1, 14.0), scored("c", 2, 6.0)];
        assert_eq!(select_by_bic(&fits), Some(1));
    }

    #[test]
    fn all_failures_surface_first_error() {
        let samples = SampleSet::new(vec![], vec![]);
        let err = fit_and_select(&candidates(), &samples, &FitOptions::default()).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { samples: 0, params: 1 });
    }
}
