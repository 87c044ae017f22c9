//! Error types for the solver.
//!
//! Only the outer surfaces (instance files, configuration, result export) can
//! fail. The search itself never errors: infeasible instances and exhausted
//! time budgets are ordinary outcomes reported through the result record.

use thiserror::Error;

/// Result type alias for fallible solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Debug, Error)]
pub enum SolverError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed instance file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The instance is structurally invalid (bad dimension, negative cost, ...).
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// Invalid configuration parameter.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SolverError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        SolverError::Parse {
            line,
            message: message.into(),
        }
    }
}
