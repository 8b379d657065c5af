//! Error types for structured SVM training

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructSVMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Optimization failed: {0}")]
    OptimizationError(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Ground truth must be binary, got {value} at index {index}")]
    NonBinaryGroundTruth { index: usize, value: f64 },

    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("Infeasible problem: {0}")]
    Infeasible(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, StructSVMError>;
