//! Formatted terminal output for fits and comparisons.
//!
//! Formatting lives in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{FitConfig, FitResult, SampleSet, SigmaMode};
use crate::error::AppError;
use crate::fit::selection::FitSelection;
use crate::io::ingest::IngestedData;
use crate::report::SampleResidual;

/// Header block: input file, columns and dataset ranges.
pub fn format_run_header(data: &IngestedData, config: &FitConfig) -> String {
    let mut out = String::new();
    let samples = &data.samples;

    out.push_str("=== labfit - weighted least-squares fit ===\n");
    out.push_str(&format!("Input: {}\n", config.input.display()));
    out.push_str(&format!(
        "Columns: x={} y={} sigma={}\n",
        samples.x_label,
        samples.y_label,
        sigma_source(samples, config),
    ));
    if let Some(stats) = samples.stats() {
        out.push_str(&format!(
            "Points: n={} | {}=[{}, {}] | {}=[{}, {}]\n",
            stats.n_points,
            samples.x_label,
            fmt_num(stats.x_min),
            fmt_num(stats.x_max),
            samples.y_label,
            fmt_num(stats.y_min),
            fmt_num(stats.y_max),
        ));
    }
    if !data.row_errors.is_empty() {
        out.push_str(&format!(
            "Skipped rows: {} of {}\n",
            data.row_errors.len(),
            data.rows_read
        ));
    }
    out.push('\n');
    out
}

fn sigma_source(samples: &SampleSet, config: &FitConfig) -> String {
    match (&config.sigma_col, config.sigma, samples.sigma()) {
        (Some(col), _, Some(_)) => col.clone(),
        (None, Some(s), _) => format!("{} (constant)", fmt_num(s)),
        _ => "none (unit weights)".to_string(),
    }
}

/// Parameter estimates with uncertainties, fit statistics, and correlations.
pub fn format_fit_summary(fit: &FitResult) -> String {
    let mut out = String::new();
    let se = fit.std_errors();
    let width = fit.param_names.iter().map(|n| n.len()).max().unwrap_or(1);

    out.push_str(&format!("Model: {}\n", fit.model));
    for ((name, value), err) in fit.param_names.iter().zip(&fit.params).zip(&se) {
        out.push_str(&format!(
            "  {name:<width$} = {} ± {}\n",
            fmt_num(*value),
            fmt_num(*err)
        ));
    }

    out.push_str(&format!(
        "chi2 = {} | dof = {} | reduced chi2 = {}\n",
        fmt_num(fit.chi_square),
        fit.dof(),
        fit.reduced_chi_square()
            .map(fmt_num)
            .unwrap_or_else(|| "n/a".to_string()),
    ));
    out.push_str(&format!(
        "iterations = {} | sigma = {}\n",
        fit.iterations,
        match fit.sigma_mode {
            SigmaMode::Absolute => "absolute",
            SigmaMode::Relative => "relative (covariance scaled by reduced chi2)",
        }
    ));

    if fit.param_count() > 1 {
        let corr = fit.correlation();
        out.push_str("Correlation:\n");
        let mut head = format!("  {:<width$}", "");
        for name in &fit.param_names {
            head.push_str(&format!(" {name:>8}"));
        }
        out.push_str(head.trim_end());
        out.push('\n');
        for (i, name) in fit.param_names.iter().enumerate() {
            let mut row = format!("  {name:<width$}");
            for j in 0..fit.param_count() {
                row.push_str(&format!(" {:>8.3}", corr[(i, j)]));
            }
            out.push_str(&row);
            out.push('\n');
        }
    }

    out
}

/// Compare estimates against known reference values (`known g = 9.81, diff = ...`).
///
/// Fails when a reference names a parameter the model does not have.
pub fn format_reference_comparison(fit: &FitResult, expected: &[(String, f64)]) -> Result<String, AppError> {
    let mut out = String::new();
    if expected.is_empty() {
        return Ok(out);
    }

    let se = fit.std_errors();
    out.push_str("Reference values:\n");
    for (name, known) in expected {
        let idx = fit.param_names.iter().position(|n| n == name).ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Unknown parameter '{name}' in --expect (model has: {}).",
                    fit.param_names.join(", ")
                ),
            )
        })?;
        let diff = fit.params[idx] - known;
        let mut line = format!(
            "  known {name} = {}, fit = {}, diff = {}",
            fmt_num(*known),
            fmt_num(fit.params[idx]),
            fmt_num(diff)
        );
        if se[idx] > 0.0 && se[idx].is_finite() {
            line.push_str(&format!(" ({:.2} sigma)", diff.abs() / se[idx]));
        }
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Ranking table for a model comparison, with the BIC choice marked `*`.
pub fn format_comparison(selection: &FitSelection) -> String {
    let mut out = String::new();

    out.push_str("Model comparison (BIC = chi2 + k ln n):\n");
    out.push_str(
        format!(
            "  {:<14} {:>3} {:>14} {:>14} {:>10}",
            "model", "k", "chi2", "BIC", "dBIC"
        )
        .trim_end(),
    );
    out.push('\n');

    let best_bic = selection.best_fit().bic().unwrap_or(f64::NAN);
    for (i, fit) in selection.fits.iter().enumerate() {
        let mark = if i == selection.best { "*" } else { " " };
        match &fit.result {
            Ok(r) => {
                let bic = r.bic();
                out.push_str(&format!(
                    "{mark} {:<14} {:>3} {:>14} {:>14} {:>10.3}\n",
                    truncate(&fit.name, 14),
                    fit.param_count,
                    fmt_num(r.chi_square),
                    fmt_num(bic),
                    bic - best_bic,
                ));
            }
            Err(e) => {
                out.push_str(&format!(
                    "{mark} {:<14} {:>3}  failed: {e}\n",
                    truncate(&fit.name, 14),
                    fit.param_count,
                ));
            }
        }
    }

    out.push_str(&format!("\nChosen model: {}\n", selection.best_fit().name));
    out
}

/// Table of the samples with the largest pulls.
pub fn format_pull_table(rows: &[SampleResidual], samples: &SampleSet) -> String {
    let mut out = String::new();
    out.push_str("Largest pulls:\n");
    out.push_str(
        format!(
            "{:>6} {:>12} {:>12} {:>12} {:>12} {:>8}",
            "index",
            truncate(&samples.x_label, 12),
            truncate(&samples.y_label, 12),
            "y_fit",
            "residual",
            "pull"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<6} {:-<12} {:-<12} {:-<12} {:-<12} {:-<8}\n",
        "", "", "", "", "", ""
    ));

    for r in rows {
        out.push_str(&format!(
            "{:>6} {:>12} {:>12} {:>12} {:>12} {:>8.3}\n",
            r.index,
            fmt_num(r.x),
            fmt_num(r.y),
            fmt_num(r.y_fit),
            fmt_num(r.residual),
            r.pull,
        ));
    }
    out
}

/// Six significant-ish digits, switching to scientific notation for very
/// small or large magnitudes.
fn fmt_num(v: f64) -> String {
    let a = v.abs();
    if v == 0.0 || !v.is_finite() || (1e-3..1e6).contains(&a) {
        format!("{v:.6}")
    } else {
        format!("{v:.6e}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FitError;
    use crate::fit::selection::ModelFit;
    use nalgebra::DMatrix;

    fn free_fall_fit() -> FitResult {
        FitResult {
            model: "y = y0 + v0*t - g*t^2/2".to_string(),
            param_names: vec!["y0".to_string(), "v0".to_string(), "g".to_string()],
            params: vec![1.5, 0.2, 9.7],
            covariance: DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![1e-4, 4e-4, 0.01])),
            chi_square: 9.0,
            n_samples: 12,
            sigma_mode: SigmaMode::Absolute,
            iterations: 4,
        }
    }

    #[test]
    fn fit_summary_lists_estimates_with_errors() {
        let text = format_fit_summary(&free_fall_fit());
        assert!(text.contains("Model: y = y0 + v0*t - g*t^2/2"));
        assert!(text.contains("  y0 = 1.500000 ± 0.010000"));
        assert!(text.contains("  g  = 9.700000 ± 0.100000"));
        assert!(text.contains("dof = 9"));
        assert!(text.contains("reduced chi2 = 1.000000"));
        assert!(text.contains("sigma = absolute"));
        assert!(text.contains("Correlation:"));
    }

    #[test]
    fn reference_comparison_reports_difference() {
        let expected = vec![("g".to_string(), 9.81)];
        let text = format_reference_comparison(&free_fall_fit(), &expected).unwrap();
        assert!(text.contains("known g = 9.810000, fit = 9.700000, diff = -0.110000"));
        assert!(text.contains("(1.10 sigma)"));
    }

    #[test]
    fn reference_comparison_rejects_unknown_names() {
        let expected = vec![("R".to_string(), 220.0)];
        let err = format_reference_comparison(&free_fall_fit(), &expected).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(format_reference_comparison(&free_fall_fit(), &[]).unwrap().is_empty());
    }

    #[test]
    fn comparison_marks_choice_and_failures() {
        let selection = FitSelection {
            best: 0,
            fits: vec![
                ModelFit {
                    name: "free-fall".to_string(),
                    param_count: 3,
                    result: Ok(free_fall_fit()),
                },
                ModelFit {
                    name: "poly".to_string(),
                    param_count: 13,
                    result: Err(FitError::InsufficientData { samples: 12, params: 13 }),
                },
            ],
        };
        let text = format_comparison(&selection);
        assert!(text.contains("* free-fall"));
        assert!(text.contains("  poly"));
        assert!(text.contains("failed: "));
        assert!(text.ends_with("Chosen model: free-fall\n"));
    }

    #[test]
    fn pull_table_has_one_row_per_residual() {
        let samples = SampleSet::new(vec![0.0], vec![1.0]).with_labels("t", "y");
        let rows = vec![SampleResidual {
            index: 7,
            x: 0.1,
            y: 1.2,
            sigma: Some(0.1),
            y_fit: 1.0,
            residual: 0.2,
            pull: 2.0,
        }];
        let text = format_pull_table(&rows, &samples);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("t") && lines[1].contains("pull"));
        assert!(lines[3].trim_start().starts_with("7 "));
        assert!(lines[3].ends_with("2.000"));
    }

    #[test]
    fn numbers_switch_to_scientific_when_tiny() {
        assert_eq!(fmt_num(220.0), "220.000000");
        assert_eq!(fmt_num(0.0), "0.000000");
        assert_eq!(fmt_num(1.5e-5), "1.500000e-5");
    }
}
