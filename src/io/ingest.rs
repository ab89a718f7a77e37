//! CSV ingest for measurement tables.
//!
//! Turns a CSV file with a header row into a `SampleSet` that is safe to fit.
//!
//! Design goals:
//! - **Columns by name**: the header names the columns; the first two columns
//!   are used when no names are given
//! - **Row-level validation**: skip bad rows, but report what happened
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::SampleSet;
use crate::error::AppError;

/// Which columns hold the independent value, observed value, and uncertainty.
#[derive(Debug, Clone, Default)]
pub struct ColumnSpec {
    pub x: Option<String>,
    pub y: Option<String>,
    pub sigma: Option<String>,
}

impl ColumnSpec {
    pub fn named(x: &str, y: &str) -> Self {
        Self {
            x: Some(x.to_string()),
            y: Some(y.to_string()),
            sigma: None,
        }
    }

    pub fn with_sigma(mut self, sigma: &str) -> Self {
        self.sigma = Some(sigma.to_string());
        self
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: samples + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub samples: SampleSet,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedColumns {
    x: usize,
    y: usize,
    sigma: Option<usize>,
}

/// Load samples from a CSV file.
pub fn read_samples_csv(path: &Path, columns: &ColumnSpec) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let data = read_samples(file, columns)?;

    info!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.rows_used,
        "loaded samples"
    );
    Ok(data)
}

/// Load samples from any CSV reader.
pub fn read_samples<R: Read>(input: R, columns: &ColumnSpec) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let resolved = resolve_columns(&headers, columns)?;
    let x_label = clean_header(&headers[resolved.x]);
    let y_label = clean_header(&headers[resolved.y]);

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut sigma = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, resolved));

        match parsed {
            Ok((xi, yi, si)) => {
                x.push(xi);
                y.push(yi);
                if let Some(si) = si {
                    sigma.push(si);
                }
            }
            Err(message) => {
                warn!(line, %message, "skipping CSV row");
                row_errors.push(RowError { line, message });
            }
        }
    }

    let rows_used = x.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows remain after parsing the CSV."));
    }

    let mut samples = SampleSet::new(x, y).with_labels(x_label, y_label);
    if resolved.sigma.is_some() {
        samples = samples.with_sigma(sigma);
    }

    Ok(IngestedData {
        samples,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn resolve_columns(headers: &StringRecord, columns: &ColumnSpec) -> Result<ResolvedColumns, AppError> {
    let header_map = build_header_map(headers);

    let lookup = |name: &str| -> Result<usize, AppError> {
        header_map
            .get(&normalize_header_name(name))
            .copied()
            .ok_or_else(|| {
                let available: Vec<String> = headers.iter().map(clean_header).collect();
                AppError::new(
                    2,
                    format!(
                        "CSV has no column named '{name}' (available: {}).",
                        available.join(", ")
                    ),
                )
            })
    };

    let x = match &columns.x {
        Some(name) => lookup(name)?,
        None => 0,
    };
    let y = match &columns.y {
        Some(name) => lookup(name)?,
        None => {
            if x == 1 {
                0
            } else {
                1
            }
        }
    };
    if x.max(y) >= headers.len() {
        return Err(AppError::new(
            2,
            "CSV needs at least two columns (independent and observed values).",
        ));
    }
    if x == y {
        return Err(AppError::new(2, "Independent and observed columns must differ."));
    }

    let sigma = columns.sigma.as_deref().map(lookup).transpose()?;

    Ok(ResolvedColumns { x, y, sigma })
}

fn parse_row(record: &StringRecord, cols: ResolvedColumns) -> Result<(f64, f64, Option<f64>), String> {
    let x = parse_field(record, cols.x, "independent")?;
    let y = parse_field(record, cols.y, "observed")?;
    // Non-positive uncertainties are kept; the fitter rejects them.
    let sigma = cols
        .sigma
        .map(|idx| parse_field(record, idx, "uncertainty"))
        .transpose()?;
    Ok((x, y, sigma))
}

fn parse_field(record: &StringRecord, idx: usize, what: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .ok_or_else(|| format!("missing {what} value (column {})", idx + 1))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("invalid {what} value '{raw}'"))?;
    if !v.is_finite() {
        return Err(format!("non-finite {what} value '{raw}'"));
    }
    Ok(v)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicate names.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn clean_header(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, column lookup fails.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn normalize_header_name(name: &str) -> String {
    clean_header(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_two_columns_by_default() {
        let csv = "I,V\n0.0,0.21\n0.01,2.4\n0.02,4.62\n";
        let data = read_samples(csv.as_bytes(), &ColumnSpec::default()).unwrap();
        assert_eq!(data.rows_used, 3);
        assert_eq!(data.samples.x, vec![0.0, 0.01, 0.02]);
        assert_eq!(data.samples.y, vec![0.21, 2.4, 4.62]);
        assert_eq!(data.samples.x_label, "I");
        assert_eq!(data.samples.y_label, "V");
        assert!(data.samples.sigma.is_none());
    }

    #[test]
    fn selects_named_columns_case_insensitively_with_bom() {
        let csv = "\u{feff}t, y , dy\n0.0,1.5,0.01\n0.1,1.47,0.01\n";
        let cols = ColumnSpec::named("T", "Y").with_sigma("DY");
        let data = read_samples(csv.as_bytes(), &cols).unwrap();
        assert_eq!(data.samples.x, vec![0.0, 0.1]);
        assert_eq!(data.samples.sigma, Some(vec![0.01, 0.01]));
        assert_eq!(data.samples.x_label, "t");
    }

    #[test]
    fn swapped_default_when_x_is_second_column() {
        let csv = "V,I\n1.0,0.1\n2.0,0.2\n";
        let cols = ColumnSpec {
            x: Some("I".to_string()),
            ..ColumnSpec::default()
        };
        let data = read_samples(csv.as_bytes(), &cols).unwrap();
        assert_eq!(data.samples.x, vec![0.1, 0.2]);
        assert_eq!(data.samples.y, vec![1.0, 2.0]);
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let csv = "x,y,s\n1,2,0.1\nfoo,3,0.1\n2,4,bad\n3,6,0.1\n4\n";
        let cols = ColumnSpec::named("x", "y").with_sigma("s");
        let data = read_samples(csv.as_bytes(), &cols).unwrap();
        assert_eq!(data.rows_read, 5);
        assert_eq!(data.rows_used, 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 6]);
        assert_eq!(data.samples.sigma.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn non_positive_uncertainty_is_kept_for_the_fitter() {
        let csv = "x,y,s\n1,2,0.1\n2,4,0\n3,6,-0.5\n";
        let cols = ColumnSpec::named("x", "y").with_sigma("s");
        let data = read_samples(csv.as_bytes(), &cols).unwrap();
        assert_eq!(data.rows_used, 3);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.samples.sigma, Some(vec![0.1, 0.0, -0.5]));
    }

    #[test]
    fn unknown_column_is_a_config_error() {
        let csv = "I,V\n1,2\n";
        let err = read_samples(csv.as_bytes(), &ColumnSpec::named("I", "U")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("'U'"));
    }

    #[test]
    fn no_valid_rows_is_insufficient_data() {
        let csv = "I,V\nx,y\n";
        let err = read_samples(csv.as_bytes(), &ColumnSpec::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
