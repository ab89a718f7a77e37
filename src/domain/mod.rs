//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration enums (`ModelSpec`, `SigmaMode`)
//! - measurement containers (`Sample`, `SampleSet`)
//! - fit outputs (`FitResult`, `FitSummary`)
//! - run configuration (`GenerateConfig`, `FitConfig`)

pub mod types;

pub use types::*;
