//! Access to hierarchical array containers.
//!
//! The validator and the reader only see a container through [`Container`]:
//! named groups and datasets addressed by slash-separated paths, shape
//! introspection and strided reads. A handle is closed when it is dropped.

use crate::Result;
use ndarray::{Ix1, Ix3};
use std::path::Path;
use tomors_core::{NumericArray, Window};

/// An open hierarchical array container.
pub trait Container {
    /// Returns true if `path` names a group.
    fn contains_group(&self, path: &str) -> bool;

    /// Returns true if `path` names a dataset.
    fn contains_dataset(&self, path: &str) -> bool;

    /// Shape of the dataset at `path`; empty for a scalar.
    ///
    /// # Errors
    /// Returns an error if the dataset cannot be opened.
    fn shape(&self, path: &str) -> Result<Vec<usize>>;

    /// Reads a strided window of a 3-D dataset in its native element type.
    ///
    /// Bounds beyond the extent are clamped.
    ///
    /// # Errors
    /// Returns an error if the dataset is missing, not 3-D, has a
    /// non-numeric type, a window has a zero step, or the read fails.
    fn read_volume(&self, path: &str, window: &[Window; 3]) -> Result<NumericArray<Ix3>>;

    /// Reads a strided window of a 0-D or 1-D dataset.
    ///
    /// A scalar reads as a one-element vector.
    ///
    /// # Errors
    /// Returns an error if the dataset is missing, has more than one axis,
    /// has a non-numeric type, the window has a zero step, or the read fails.
    fn read_vector(&self, path: &str, window: Window) -> Result<NumericArray<Ix1>>;
}

/// Opens containers by file path.
pub trait ContainerOpener {
    type Container: Container;

    /// Opens `path` read-only.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened as a container.
    fn open(&self, path: &Path) -> Result<Self::Container>;
}
