//! Fallback values for auxiliary fields that are missing or invalid.

use crate::array::NumericArray;
use ndarray::{Array1, Array3, Ix1, Ix3};

/// Assumed rotation range when a file carries no angles, in degrees.
pub const ASSUMED_ROTATION_DEG: f64 = 180.0;

/// A single reference frame filled with the mean of the projection data.
///
/// The result has shape `(1, slices, pixels)` so it broadcasts against the
/// projections like a one-shot flat or dark field. An empty projection
/// window yields a zero-filled frame.
#[must_use]
pub fn reference_frame(data: &NumericArray<Ix3>) -> NumericArray<Ix3> {
    let shape = data.shape();
    let mean = data.mean().unwrap_or(0.0);
    Array3::from_elem((1, shape[1], shape[2]), mean).into()
}

/// Evenly spaced angles over an assumed 180 degree rotation.
///
/// Angle `i` is `i * 180 / (n + 1)` for `i` in `0..n`, so the sequence
/// starts at zero and stays strictly below `180 * n / (n + 1)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rotation_angles(n: usize) -> NumericArray<Ix1> {
    let denom = (n + 1) as f64;
    Array1::from_iter((0..n).map(|i| i as f64 * ASSUMED_ROTATION_DEG / denom)).into()
}
