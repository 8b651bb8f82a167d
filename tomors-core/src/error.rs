//! Error types for tomors-core.

use thiserror::Error;

/// Result type alias for tomors operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for tomors operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A slicing window that cannot be applied to an axis.
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// Array does not have the expected number of axes.
    #[error("expected a {expected}-D array, found {found}-D")]
    Dimensionality { expected: usize, found: usize },

    /// Array shape error.
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
