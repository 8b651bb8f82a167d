//! Error types for tomors-algorithms.

use thiserror::Error;
use tomors_core::IngestStatus;

/// Result type alias for downstream drivers.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by downstream drivers.
#[derive(Error, Debug)]
pub enum Error {
    /// The dataset has not been read successfully.
    #[error("dataset is not ready (status: {0:?})")]
    NotReady(IngestStatus),

    /// Invalid driver parameters.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Image encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] tomors_core::Error),
}
