//! CSV exports: generated samples and per-sample fit results.
//!
//! Both are meant to be easy to consume in spreadsheets or downstream scripts,
//! and the sample export is readable again by `io::ingest`.

use std::path::Path;

use tracing::info;

use crate::domain::SampleSet;
use crate::error::AppError;
use crate::report::SampleResidual;

/// Write samples as `x,y[,sigma]` with the sample set's labels as the header.
///
/// The uncertainty column is named `d<y_label>` (e.g. `dV`).
pub fn write_samples_csv(path: &Path, samples: &SampleSet, include_sigma: bool) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;

    let sigma = if include_sigma { samples.sigma() } else { None };
    let sigma_header = format!("d{}", samples.y_label);

    let mut header = vec![samples.x_label.as_str(), samples.y_label.as_str()];
    if sigma.is_some() {
        header.push(sigma_header.as_str());
    }
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

    for (i, (x, y)) in samples.x.iter().zip(samples.y.iter()).enumerate() {
        let mut row = vec![x.to_string(), y.to_string()];
        if let Some(s) = sigma {
            row.push(s.get(i).copied().unwrap_or(f64::NAN).to_string());
        }
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))?;

    info!(path = %path.display(), rows = samples.len(), "wrote samples");
    Ok(())
}

/// Write per-sample fitted values, residuals, and pulls.
pub fn write_residuals_csv(
    path: &Path,
    residuals: &[SampleResidual],
    samples: &SampleSet,
) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record([
            "index",
            samples.x_label.as_str(),
            samples.y_label.as_str(),
            "sigma",
            "y_fit",
            "residual",
            "pull",
        ])
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in residuals {
        writer
            .write_record([
                r.index.to_string(),
                format!("{:.10}", r.x),
                format!("{:.10}", r.y),
                r.sigma.map(|s| format!("{s:.10}")).unwrap_or_default(),
                format!("{:.10}", r.y_fit),
                format!("{:.10}", r.residual),
                format!("{:.6}", r.pull),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;

    info!(path = %path.display(), rows = residuals.len(), "wrote residuals");
    Ok(())
}
