//! Measurement sources: synthetic lab data generation.

pub mod sample;

pub use sample::*;
