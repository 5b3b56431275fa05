//! Error types for ewsgrid

use thiserror::Error;

/// Main error type for ewsgrid operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid grid dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Index out of bounds: ({row}, {col}) in grid of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Grid contains {count} missing value(s); grids must be cleaned before analysis")]
    MissingValues { count: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Fit unavailable for {family}: {reason}")]
    FitUnavailable {
        family: &'static str,
        reason: String,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Null model fit failed: {0}")]
    NullModelFit(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for ewsgrid operations
pub type Result<T> = std::result::Result<T, Error>;
