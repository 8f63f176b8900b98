//! Error types for STRATUS.

use thiserror::Error;

/// Unified error type for all STRATUS operations.
///
/// Every error is fatal to the current run: there is no automatic retry,
/// and callers must surface failures rather than swallow them.
#[derive(Error, Debug)]
pub enum StratusError {
    /// Bad initializer or configuration arguments
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Shape mismatch between parameter vectors and model/optimizer expectations
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Propagated unmodified from the simulation collaborator
    #[error("Environment failure: {0}")]
    EnvironmentFailure(String),

    /// Mathematical/numerical errors (e.g., NaN cost, eigendecomposition failure)
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// I/O errors (history/weight artifact writing)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StratusError {
    /// Creates an invalid-configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        StratusError::InvalidConfiguration(message.into())
    }

    /// Creates a dimension-mismatch error.
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        StratusError::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Creates an environment-failure error.
    pub fn environment(message: impl Into<String>) -> Self {
        StratusError::EnvironmentFailure(message.into())
    }

    /// Creates a numerical error.
    pub fn numerical(message: impl Into<String>) -> Self {
        StratusError::NumericalError(message.into())
    }
}

/// Result type alias for STRATUS operations.
pub type Result<T> = std::result::Result<T, StratusError>;
