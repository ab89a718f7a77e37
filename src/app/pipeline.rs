//! Shared "fit pipeline" logic used by the `fit` and `compare` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> fit (one model or several) -> selection -> residuals
//!
//! The commands can then focus on presentation (text, plots, JSON).

use tracing::info;

use crate::data::generate_seeded;
use crate::domain::{FitConfig, FitResult, GenerateConfig, SampleSet};
use crate::error::AppError;
use crate::fit::fitter::{FitOptions, fit_samples};
use crate::fit::selection::{FitSelection, fit_and_select};
use crate::io::export::write_samples_csv;
use crate::io::ingest::{ColumnSpec, IngestedData, read_samples_csv};
use crate::models::Model;
use crate::report::{SampleResidual, compute_residuals};

/// All computed outputs of a single `labfit fit` run.
pub struct FitRun {
    pub data: IngestedData,
    pub model: Box<dyn Model>,
    pub fit: FitResult,
    pub residuals: Vec<SampleResidual>,
}

/// All computed outputs of a `labfit compare` run.
pub struct CompareRun {
    pub data: IngestedData,
    pub candidates: Vec<(String, Box<dyn Model>)>,
    pub selection: FitSelection,
    /// Residuals of the selected model.
    pub residuals: Vec<SampleResidual>,
}

impl CompareRun {
    pub fn best_model(&self) -> &dyn Model {
        self.candidates[self.selection.best].1.as_ref()
    }

    /// The selected model's fit. Selection only picks successful fits.
    pub fn best_fit(&self) -> Result<&FitResult, AppError> {
        self.selection
            .best_fit()
            .result
            .as_ref()
            .map_err(|e| AppError::from(e.clone()))
    }
}

/// Read the CSV named by `config` and attach uncertainties.
pub fn load_samples(config: &FitConfig) -> Result<IngestedData, AppError> {
    let columns = ColumnSpec {
        x: config.x_col.clone(),
        y: config.y_col.clone(),
        sigma: config.sigma_col.clone(),
    };
    let mut data = read_samples_csv(&config.input, &columns)?;

    if let Some(sigma) = config.sigma {
        if config.sigma_col.is_some() {
            return Err(AppError::new(2, "Use either a sigma column or a constant sigma, not both."));
        }
        data.samples = std::mem::take(&mut data.samples).with_uniform_sigma(sigma);
    }
    Ok(data)
}

pub fn fit_options(config: &FitConfig) -> FitOptions {
    FitOptions {
        initial_guess: config.initial_guess.clone(),
        sigma_mode: config.sigma_mode,
        max_iterations: config.max_iterations,
        ftol: config.ftol,
        ..FitOptions::default()
    }
}

/// Fit the first configured model.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    let spec = config
        .models
        .first()
        .copied()
        .ok_or_else(|| AppError::new(2, "No model selected."))?;

    let data = load_samples(config)?;
    let model = spec.build(config.degree);
    let fit = fit_samples(model.as_ref(), &data.samples, &fit_options(config))?;
    info!(model = %fit.model, chi_square = fit.chi_square, iterations = fit.iterations, "fitted model");

    let residuals = compute_residuals(&data.samples, model.as_ref(), &fit)?;
    Ok(FitRun {
        data,
        model,
        fit,
        residuals,
    })
}

/// Fit every configured model and select one by BIC.
///
/// Per-model initial guesses are not shared: each candidate starts from its own default.
pub fn run_compare(config: &FitConfig) -> Result<CompareRun, AppError> {
    if config.models.is_empty() {
        return Err(AppError::new(2, "No candidate models given."));
    }

    let data = load_samples(config)?;
    let candidates: Vec<(String, Box<dyn Model>)> = config
        .models
        .iter()
        .map(|spec| (spec.display_name().to_string(), spec.build(config.degree)))
        .collect();

    let opts = FitOptions {
        initial_guess: None,
        ..fit_options(config)
    };
    let selection = fit_and_select(&candidates, &data.samples, &opts)?;

    let run = CompareRun {
        data,
        candidates,
        selection,
        residuals: Vec::new(),
    };
    let residuals = compute_residuals(&run.data.samples, run.best_model(), run.best_fit()?)?;
    Ok(CompareRun { residuals, ..run })
}

/// Generate a synthetic dataset and write it to `config.output`.
pub fn run_generate(config: &GenerateConfig) -> Result<SampleSet, AppError> {
    let samples = generate_seeded(config)?;
    write_samples_csv(&config.output, &samples, config.with_sigma)?;
    Ok(samples)
}
