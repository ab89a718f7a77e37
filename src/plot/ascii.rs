//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed samples: `o`
//! - one-sigma error bars: `|`
//! - fitted curve: `-` line

use crate::domain::{FitResult, SampleSet};
use crate::math::linspace;
use crate::models::Model;

/// Curve evaluations per output column.
const CURVE_OVERSAMPLE: usize = 4;

/// Render samples with error bars and the fitted curve on a `width` x `height` grid.
///
/// The curve is evaluated on a dense grid across the sample domain.
pub fn render_ascii_plot(
    samples: &SampleSet,
    model: &dyn Model,
    fit: &FitResult,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(samples).unwrap_or((0.0, 1.0));
    let curve: Vec<(f64, f64)> = linspace(x_min, x_max, width * CURVE_OVERSAMPLE)
        .into_iter()
        .map(|x| (x, fit.predict(model, x)))
        .filter(|(_, y)| y.is_finite())
        .collect();

    let (y_min, y_max) = y_range(samples, &curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first, then error bars, then points on top.
    draw_curve(&mut grid, &curve, x_min, x_max, y_min, y_max);

    for s in samples.iter() {
        if let Some(sigma) = s.sigma {
            let col = map_x(s.x, x_min, x_max, width);
            let top = map_y(s.y + sigma, y_min, y_max, height);
            let bottom = map_y(s.y - sigma, y_min, y_max, height);
            for row in grid.iter_mut().take(bottom + 1).skip(top) {
                row[col] = '|';
            }
        }
    }

    for s in samples.iter() {
        let col = map_x(s.x, x_min, x_max, width);
        let row = map_y(s.y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}=[{x_min:.3}, {x_max:.3}] | {}=[{y_min:.3}, {y_max:.3}]\n",
        samples.x_label, samples.y_label
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Sample domain, widened by one unit when all samples share one x.
pub(crate) fn x_range(samples: &SampleSet) -> Option<(f64, f64)> {
    let stats = samples.stats()?;
    if !(stats.x_min.is_finite() && stats.x_max.is_finite()) {
        return None;
    }
    if stats.x_max > stats.x_min {
        Some((stats.x_min, stats.x_max))
    } else {
        Some((stats.x_min - 1.0, stats.x_max + 1.0))
    }
}

/// Observed range including error bars and the curve.
pub(crate) fn y_range(samples: &SampleSet, curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for s in samples.iter() {
        let sigma = s.sigma.unwrap_or(0.0);
        min_y = min_y.min(s.y - sigma);
        max_y = max_y.max(s.y + sigma);
    }
    for &(_, y) in curve {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() && min_y == max_y {
        Some((min_y - 1.0, max_y + 1.0))
    } else {
        None
    }
}

pub(crate) fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
