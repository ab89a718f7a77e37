//! `lab-fit` library crate.
//!
//! The binary (`labfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitter can be used directly from other Rust code
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

pub use domain::{FitResult, SampleSet, SigmaMode};
pub use error::FitError;
pub use fit::{FitOptions, curve_fit};
pub use models::Model;
