//! Command-line parsing for the lab curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::LabPreset;
use crate::domain::ModelSpec;
use crate::fit::fitter::{DEFAULT_FTOL, DEFAULT_MAX_ITERATIONS};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "labfit",
    version,
    about = "Weighted least-squares curve fitting for lab measurements"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "LABFIT_LOG", default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a synthetic lab dataset (noisy samples of a known model) as CSV.
    Generate(GenerateArgs),
    /// Fit one model to a CSV dataset and report estimates with uncertainties.
    Fit(FitArgs),
    /// Fit several models to the same dataset and pick one by BIC.
    Compare(CompareArgs),
}

/// Options for synthetic data generation.
///
/// Every setting defaults to the chosen preset; flags override individual values.
#[derive(Debug, Parser, Clone)]
pub struct GenerateArgs {
    /// Lab exercise to reproduce.
    #[arg(long, value_enum, default_value_t = LabPreset::Ohm)]
    pub preset: LabPreset,

    /// Ground-truth model (defaults to the preset's).
    #[arg(long, value_enum)]
    pub model: Option<ModelSpec>,

    /// Polynomial degree for `--model poly`.
    #[arg(long)]
    pub degree: Option<usize>,

    /// Ground-truth parameters, comma-separated, in the model's order.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub truth: Option<Vec<f64>>,

    /// First x value of the evenly spaced grid.
    #[arg(long, allow_negative_numbers = true)]
    pub x_start: Option<f64>,

    /// Last x value of the grid (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    pub x_end: Option<f64>,

    /// Number of samples.
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// One-sigma Gaussian noise on each observed value (0 = exact data).
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Random seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Header name of the independent column.
    #[arg(long)]
    pub x_name: Option<String>,

    /// Header name of the observed column.
    #[arg(long)]
    pub y_name: Option<String>,

    /// Also write the per-sample uncertainty column.
    #[arg(long)]
    pub with_sigma: bool,

    /// Output CSV path.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

/// Input, solver, and output options shared by `fit` and `compare`.
#[derive(Debug, Args, Clone)]
pub struct CommonFitArgs {
    /// CSV file with a header row.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Independent-value column (defaults to the first column).
    #[arg(long)]
    pub x_col: Option<String>,

    /// Observed-value column (defaults to the second column).
    #[arg(long)]
    pub y_col: Option<String>,

    /// Per-sample uncertainty column.
    #[arg(long, conflicts_with = "sigma")]
    pub sigma_col: Option<String>,

    /// Constant uncertainty applied to every sample.
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Treat uncertainties as absolute one-sigma errors (covariance is not rescaled).
    #[arg(long)]
    pub absolute_sigma: bool,

    /// Polynomial degree for `poly`.
    #[arg(long, default_value_t = 2)]
    pub degree: usize,

    /// Iteration limit for the solver.
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iter: usize,

    /// Relative chi-square tolerance for convergence.
    #[arg(long, default_value_t = DEFAULT_FTOL)]
    pub ftol: f64,

    /// Show the N samples with the largest pulls (0 disables the table).
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Write the sample/fit overlay to an SVG file.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Export per-sample fitted values, residuals, and pulls to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Print a JSON summary to stdout instead of the text report.
    #[arg(long)]
    pub json: bool,
}

/// Options for fitting a single model.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub common: CommonFitArgs,

    /// Which model to fit.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelSpec::Affine)]
    pub model: ModelSpec,

    /// Initial parameter guess, comma-separated.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub p0: Option<Vec<f64>>,

    /// Known reference value to compare an estimate with (`name=value`, repeatable).
    #[arg(long, value_name = "NAME=VALUE", value_parser = parse_expectation)]
    pub expect: Vec<(String, f64)>,
}

/// Options for comparing several models.
#[derive(Debug, Parser, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub common: CommonFitArgs,

    /// Candidate models, comma-separated.
    #[arg(long, value_enum, value_delimiter = ',', default_values = ["affine", "origin"])]
    pub models: Vec<ModelSpec>,
}

/// Parse `name=value` for `--expect`.
fn parse_expectation(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number in '{raw}'"))?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fit_args_parse_lists_and_expectations() {
        let cli = Cli::try_parse_from([
            "labfit",
            "fit",
            "-i",
            "FreeFallData.csv",
            "--model",
            "free-fall",
            "--sigma-col",
            "dy",
            "--absolute-sigma",
            "--p0",
            "1,0,-9.8",
            "--expect",
            "g=9.81",
            "--no-plot",
        ])
        .unwrap();

        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        assert_eq!(args.model, ModelSpec::FreeFall);
        assert_eq!(args.p0, Some(vec![1.0, 0.0, -9.8]));
        assert_eq!(args.expect, vec![("g".to_string(), 9.81)]);
        assert!(args.common.absolute_sigma);
        assert!(args.common.no_plot);
        assert_eq!(args.common.sigma_col.as_deref(), Some("dy"));
        assert_eq!(cli.log_level, tracing::Level::WARN);
    }

    #[test]
    fn compare_defaults_to_affine_and_origin() {
        let cli = Cli::try_parse_from(["labfit", "compare", "-i", "data.csv"]).unwrap();
        let Command::Compare(args) = cli.command else {
            panic!("expected compare subcommand");
        };
        assert_eq!(args.models, vec![ModelSpec::Affine, ModelSpec::Origin]);
    }

    #[test]
    fn generate_accepts_negative_range() {
        let cli = Cli::try_parse_from([
            "labfit", "generate", "--preset", "free-fall", "--x-start", "-0.5", "--log-level", "debug",
        ])
        .unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate subcommand");
        };
        assert_eq!(args.preset, LabPreset::FreeFall);
        assert_eq!(args.x_start, Some(-0.5));
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn sigma_and_sigma_col_conflict() {
        let res = Cli::try_parse_from(["labfit", "fit", "-i", "d.csv", "--sigma", "0.1", "--sigma-col", "dy"]);
        assert!(res.is_err());
    }

    #[test]
    fn expectation_parser_rejects_malformed_input() {
        assert!(parse_expectation("g").is_err());
        assert!(parse_expectation("=1").is_err());
        assert!(parse_expectation("g=abc").is_err());
        assert_eq!(parse_expectation(" R = 220 ").unwrap(), ("R".to_string(), 220.0));
    }
}
