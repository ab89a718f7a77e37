//! Curve fitting.
//!
//! Responsibilities:
//!
//! - weighted Levenberg–Marquardt fit of a single model (`fitter`)
//! - fit several models to the same samples and pick one by BIC (`selection`)

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
