//! Error types.
//!
//! - `FitError`: everything the fitter can reject or fail on (library level)
//! - `AppError`: a message plus a process exit code (binary level)
//!
//! Exit codes used by `labfit`:
//! - 2: invalid input, configuration, or I/O
//! - 3: not enough data to fit
//! - 4: computation failure (solver did not converge, singular covariance)

use thiserror::Error;

/// Why a single fit invocation failed.
///
/// Every variant is terminal for that invocation: no partial result is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Fewer samples than free parameters.
    #[error("insufficient data: {samples} sample(s) for {params} free parameter(s)")]
    InsufficientData { samples: usize, params: usize },

    /// An uncertainty was zero, negative, or not finite.
    #[error("uncertainty at index {index} must be strictly positive, got {value}")]
    NonPositiveUncertainty { index: usize, value: f64 },

    /// Input sequences (or the initial guess) have inconsistent lengths.
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An independent or observed value is NaN or infinite.
    #[error("non-finite {what} value at index {index}")]
    NonFiniteInput { what: &'static str, index: usize },

    /// The solver did not reach its tolerance, or the optimum is degenerate.
    #[error("fit did not converge: {0}")]
    Convergence(String),
}

impl FitError {
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::InsufficientData { .. } => 3,
            FitError::NonPositiveUncertainty { .. }
            | FitError::DimensionMismatch { .. }
            | FitError::NonFiniteInput { .. } => 2,
            FitError::Convergence(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
