//! SVG export of the sample/fit overlay using Plotters.
//!
//! Same content as the terminal plot, at a resolution fit for a lab report:
//! error bars, observed samples, the fitted curve, and a legend.

use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::domain::{FitResult, SampleSet};
use crate::error::AppError;
use crate::math::linspace;
use crate::models::Model;
use crate::plot::ascii::{pad_range, x_range, y_range};

/// Points on the dense curve grid.
const CURVE_POINTS: usize = 300;

/// Pixel size of the written image.
#[derive(Debug, Clone, Copy)]
pub struct SvgSize {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgSize {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Write the overlay plot to `path`.
pub fn write_svg_plot(
    path: &Path,
    samples: &SampleSet,
    model: &dyn Model,
    fit: &FitResult,
    size: SvgSize,
) -> Result<(), AppError> {
    let (x0, x1) = x_range(samples).ok_or_else(|| AppError::new(3, "Nothing to plot: no samples."))?;
    let curve: Vec<(f64, f64)> = linspace(x0, x1, CURVE_POINTS)
        .into_iter()
        .map(|x| (x, fit.predict(model, x)))
        .filter(|(_, y)| y.is_finite())
        .collect();
    let (y0, y1) = y_range(samples, &curve).ok_or_else(|| AppError::new(4, "Nothing finite to plot."))?;
    let (y0, y1) = pad_range(y0, y1, 0.05);

    draw(path, samples, fit, &curve, (x0, x1), (y0, y1), size)
        .map_err(|e| AppError::new(2, format!("Failed to write SVG '{}': {e}", path.display())))?;

    info!(path = %path.display(), "wrote SVG plot");
    Ok(())
}

fn draw(
    path: &Path,
    samples: &SampleSet,
    fit: &FitResult,
    curve: &[(f64, f64)],
    (x0, x1): (f64, f64),
    (y0, y1): (f64, f64),
    size: SvgSize,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&fit.model, ("sans-serif", 18))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc(samples.x_label.as_str())
        .y_desc(samples.y_label.as_str())
        .x_labels(8)
        .y_labels(8)
        .draw()?;

    let curve_color = RGBColor(200, 30, 30);
    let points_color = RGBColor(30, 60, 200);

    if samples.sigma().is_some() {
        chart.draw_series(samples.iter().filter_map(|s| {
            s.sigma.map(|sigma| {
                ErrorBar::new_vertical(s.x, s.y - sigma, s.y, s.y + sigma, points_color.filled(), 6)
            })
        }))?;
    }

    chart
        .draw_series(samples.iter().map(|s| Circle::new((s.x, s.y), 3, points_color.filled())))?
        .label("samples")
        .legend(move |(x, y)| Circle::new((x + 10, y), 3, points_color.filled()));

    chart
        .draw_series(LineSeries::new(curve.iter().copied(), &curve_color))?
        .label("fit")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &curve_color));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
