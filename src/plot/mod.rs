//! Plot rendering: a fixed-size terminal plot and an SVG file export.

pub mod ascii;
pub mod svg;

pub use ascii::render_ascii_plot;
pub use svg::{SvgSize, write_svg_plot};
