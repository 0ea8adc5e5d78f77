use thiserror::Error;

/// Error types for the curvefit library.
///
/// Parse failures, circular parameter references and rejected fit attempts are
/// recovered locally (constant-zero fallback, NaN values, parameter rollback)
/// and never surface through this type; `FitError` covers conditions that
/// indicate a misused or numerically unsolvable call.
#[derive(Error, Debug)]
pub enum FitError {
    /// Mismatched array lengths (samples vs. samples, coefficients vs. data).
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A linear system inside a minimizer or the polynomial fit had no solution.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// Invalid input data (empty samples, degree out of range, bad name).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Parameter not found by name.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error for cases that don't fit the other categories.
    #[error("Error: {0}")]
    Other(String),
}

impl From<crate::expr::ExpressionError> for FitError {
    fn from(err: crate::expr::ExpressionError) -> Self {
        FitError::ParameterError(format!("{}", err))
    }
}

/// Result type alias for curvefit operations.
pub type Result<T> = std::result::Result<T, FitError>;

/// Extensions for converting from other error types.
impl From<String> for FitError {
    fn from(s: String) -> Self {
        FitError::Other(s)
    }
}

impl From<&str> for FitError {
    fn from(s: &str) -> Self {
        FitError::Other(s.to_string())
    }
}
