//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// A node that was expected in the container is absent.
    #[error("missing node: {0}")]
    MissingNode(String),

    /// A node holds a non-numeric element type.
    #[error("unsupported element type {dtype} in {path}")]
    UnsupportedType { path: String, dtype: String },

    /// Array shape error.
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] tomors_core::Error),
}
