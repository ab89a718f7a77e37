//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - sample and residual CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
