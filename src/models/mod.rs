//! Model functions for curve fitting.
//!
//! A model is a capability (`Model` trait) rather than a fixed enum, so new
//! shapes can be fitted without touching the fitter.

pub mod model;
pub mod polynomial;

pub use model::*;
pub use polynomial::*;
