//! Mathematical utilities: Jacobians, linear least squares, and grids.

pub mod grid;
pub mod jacobian;
pub mod ols;

pub use grid::*;
pub use jacobian::*;
pub use ols::*;
