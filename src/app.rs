//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - runs generation, fitting, or model comparison
//! - prints reports/plots and writes optional exports

use clap::Parser;
use serde::Serialize;

use crate::cli::{Cli, Command, CommonFitArgs, CompareArgs, FitArgs, GenerateArgs};
use crate::data::default_truth;
use crate::domain::{FitConfig, FitResult, FitSummary, GenerateConfig, SampleSet, SigmaMode};
use crate::error::AppError;
use crate::models::Model;
use crate::plot::SvgSize;
use crate::report::SampleResidual;

pub mod pipeline;

/// Entry point for the `labfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match cli.command {
        Command::Generate(args) => handle_generate(&args),
        Command::Fit(args) => handle_fit(&args),
        Command::Compare(args) => handle_compare(&args),
    }
}

fn init_tracing(level: tracing::Level) {
    // A subscriber may already be installed (e.g. when embedded); keep it.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_generate(args: &GenerateArgs) -> Result<(), AppError> {
    let config = generate_config_from_args(args);
    let samples = pipeline::run_generate(&config)?;
    println!(
        "Wrote {} samples of {} to {}",
        samples.len(),
        config.model.display_name(),
        config.output.display()
    );
    Ok(())
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args);
    let run = pipeline::run_fit(&config)?;

    // Validate references before printing anything.
    let references = crate::report::format_reference_comparison(&run.fit, &config.expect)?;

    if config.json {
        print_json(&FitSummary::from(&run.fit))?;
    } else {
        print!("{}", crate::report::format_run_header(&run.data, &config));
        println!("{}", crate::report::format_fit_summary(&run.fit));
        if !references.is_empty() {
            println!("{references}");
        }
        print_pulls_and_plot(&config, &run.data.samples, run.model.as_ref(), &run.fit, &run.residuals);
    }

    write_outputs(&config, &run.data.samples, run.model.as_ref(), &run.fit, &run.residuals)
}

fn handle_compare(args: &CompareArgs) -> Result<(), AppError> {
    let config = compare_config_from_args(args);
    let run = pipeline::run_compare(&config)?;
    let best = run.best_fit()?;

    if config.json {
        print_json(&crate::report::ComparisonSummary::from(&run.selection))?;
    } else {
        print!("{}", crate::report::format_run_header(&run.data, &config));
        println!("{}", crate::report::format_comparison(&run.selection));
        println!("{}", crate::report::format_fit_summary(best));
        print_pulls_and_plot(&config, &run.data.samples, run.best_model(), best, &run.residuals);
    }

    write_outputs(&config, &run.data.samples, run.best_model(), best, &run.residuals)
}

fn print_pulls_and_plot(
    config: &FitConfig,
    samples: &SampleSet,
    model: &dyn Model,
    fit: &FitResult,
    residuals: &[SampleResidual],
) {
    if config.top_n > 0 {
        let top = crate::report::largest_pulls(residuals, config.top_n);
        println!("{}", crate::report::format_pull_table(&top, samples));
    }
    if config.plot {
        let plot = crate::plot::render_ascii_plot(samples, model, fit, config.plot_width, config.plot_height);
        println!("{plot}");
    }
}

fn write_outputs(
    config: &FitConfig,
    samples: &SampleSet,
    model: &dyn Model,
    fit: &FitResult,
    residuals: &[SampleResidual],
) -> Result<(), AppError> {
    if let Some(path) = &config.svg {
        crate::plot::write_svg_plot(path, samples, model, fit, SvgSize::default())?;
    }
    if let Some(path) = &config.export_residuals {
        crate::io::export::write_residuals_csv(path, residuals, samples)?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(4, format!("Failed to serialize JSON summary: {e}")))?;
    println!("{text}");
    Ok(())
}

pub fn generate_config_from_args(args: &GenerateArgs) -> GenerateConfig {
    let mut config = args.preset.config();

    if let Some(model) = args.model {
        config.model = model;
        config.degree = args.degree.unwrap_or(config.degree);
        config.truth = default_truth(model, config.degree);
    } else if let Some(degree) = args.degree {
        config.degree = degree;
    }
    if let Some(truth) = &args.truth {
        config.truth = truth.clone();
    }
    config.x_start = args.x_start.unwrap_or(config.x_start);
    config.x_end = args.x_end.unwrap_or(config.x_end);
    config.count = args.count.unwrap_or(config.count);
    config.sigma = args.sigma.unwrap_or(config.sigma);
    config.seed = args.seed.unwrap_or(config.seed);
    if let Some(name) = &args.x_name {
        config.x_name = name.clone();
    }
    if let Some(name) = &args.y_name {
        config.y_name = name.clone();
    }
    config.with_sigma |= args.with_sigma;
    if let Some(path) = &args.output {
        config.output = path.clone();
    }
    config
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    let mut config = base_config(&args.common);
    config.models = vec![args.model];
    config.initial_guess = args.p0.clone();
    config.expect = args.expect.clone();
    config
}

pub fn compare_config_from_args(args: &CompareArgs) -> FitConfig {
    let mut config = base_config(&args.common);
    config.models = args.models.clone();
    config
}

fn base_config(args: &CommonFitArgs) -> FitConfig {
    FitConfig {
        input: args.input.clone(),
        x_col: args.x_col.clone(),
        y_col: args.y_col.clone(),
        sigma_col: args.sigma_col.clone(),
        sigma: args.sigma,
        models: Vec::new(),
        degree: args.degree,
        sigma_mode: SigmaMode::from_absolute_flag(args.absolute_sigma),
        initial_guess: None,
        max_iterations: args.max_iter,
        ftol: args.ftol,
        expect: Vec::new(),
        top_n: args.top,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        svg: args.svg.clone(),
        export_residuals: args.export.clone(),
        json: args.json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LabPreset;
    use crate::domain::ModelSpec;

    fn parse(argv: &[&str]) -> Command {
        Cli::try_parse_from(argv.iter().copied()).unwrap().command
    }

    #[test]
    fn generate_defaults_follow_preset() {
        let Command::Generate(args) = parse(&["labfit", "generate"]) else {
            panic!("expected generate");
        };
        let cfg = generate_config_from_args(&args);
        let preset = LabPreset::Ohm.config();
        assert_eq!(cfg.truth, preset.truth);
        assert_eq!(cfg.count, 100);
        assert_eq!(cfg.output, preset.output);
        assert!(!cfg.with_sigma);
    }

    #[test]
    fn generate_model_override_resets_truth() {
        let Command::Generate(args) = parse(&["labfit", "generate", "--model", "poly", "--degree", "3", "--with-sigma"])
        else {
            panic!("expected generate");
        };
        let cfg = generate_config_from_args(&args);
        assert_eq!(cfg.model, ModelSpec::Poly);
        assert_eq!(cfg.truth.len(), 4);
        assert!(cfg.with_sigma);
    }

    #[test]
    fn fit_config_maps_flags() {
        let Command::Fit(args) = parse(&[
            "labfit", "fit", "-i", "d.csv", "--absolute-sigma", "--no-plot", "--export", "out.csv", "--expect", "g=9.81",
        ]) else {
            panic!("expected fit");
        };
        let cfg = fit_config_from_args(&args);
        assert_eq!(cfg.models, vec![ModelSpec::Affine]);
        assert_eq!(cfg.sigma_mode, SigmaMode::Absolute);
        assert!(!cfg.plot);
        assert_eq!(cfg.export_residuals.as_deref(), Some(std::path::Path::new("out.csv")));
        assert_eq!(cfg.expect.len(), 1);
    }

    #[test]
    fn compare_config_defaults_to_relative_sigma() {
        let Command::Compare(args) = parse(&["labfit", "compare", "-i", "d.csv", "--models", "affine,quadratic"]) else {
            panic!("expected compare");
        };
        let cfg = compare_config_from_args(&args);
        assert_eq!(cfg.sigma_mode, SigmaMode::Relative);
        assert_eq!(cfg.models, vec![ModelSpec::Affine, ModelSpec::Quadratic]);
        assert!(cfg.plot);
    }
}
