//! Per-frame transforms over projection data.

use crate::{require_ready, Error, Result};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Array3, ArrayViewMut2, Axis};
use tomors_core::Dataset;

/// An in-place operation on one (row, column) frame.
///
/// Frames are independent, so [`apply_to_volume`] hands each worker its own
/// frame.
pub trait FrameTransform: Sync {
    /// Transforms a frame in place.
    fn apply(&self, frame: ArrayViewMut2<'_, f32>);
}

/// Parameters of adaptive thresholding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveSegmentParams {
    /// Side of the square neighbourhood, in pixels. Must be odd.
    pub block_size: usize,
    /// Subtracted from the local mean before comparing.
    pub offset: f32,
}

impl Default for AdaptiveSegmentParams {
    fn default() -> Self {
        Self {
            block_size: 35,
            offset: 0.0,
        }
    }
}

impl AdaptiveSegmentParams {
    /// Validate parameters.
    ///
    /// # Errors
    /// Returns an error if the block size is even or zero.
    pub fn validate(&self) -> Result<()> {
        if self.block_size % 2 == 0 {
            return Err(Error::ConfigError(format!(
                "block_size must be odd, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}

/// Binarizes each frame against its local mean.
///
/// A pixel becomes 1.0 if it exceeds the mean of its `block_size` square
/// neighbourhood minus `offset`, and 0.0 otherwise. Neighbourhoods are
/// truncated at the frame border.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveThreshold {
    params: AdaptiveSegmentParams,
}

impl AdaptiveThreshold {
    /// Create a thresholding transform.
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid.
    pub fn new(params: AdaptiveSegmentParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Transform parameters.
    #[must_use]
    pub fn params(&self) -> AdaptiveSegmentParams {
        self.params
    }
}

impl FrameTransform for AdaptiveThreshold {
    #[allow(clippy::cast_precision_loss)]
    fn apply(&self, mut frame: ArrayViewMut2<'_, f32>) {
        let (rows, cols) = frame.dim();
        let half = self.params.block_size / 2;

        // Summed-area table with a zero border row and column.
        let mut table = Array2::<f64>::zeros((rows + 1, cols + 1));
        for r in 0..rows {
            let mut row_sum = 0.0;
            for c in 0..cols {
                row_sum += f64::from(frame[[r, c]]);
                table[[r + 1, c + 1]] = table[[r, c + 1]] + row_sum;
            }
        }

        let offset = f64::from(self.params.offset);
        for ((r, c), value) in frame.indexed_iter_mut() {
            let (r0, r1) = (r.saturating_sub(half), (r + half + 1).min(rows));
            let (c0, c1) = (c.saturating_sub(half), (c + half + 1).min(cols));
            let sum = table[[r1, c1]] - table[[r0, c1]] - table[[r1, c0]] + table[[r0, c0]];
            let mean = sum / ((r1 - r0) * (c1 - c0)) as f64;
            *value = if f64::from(*value) > mean - offset {
                1.0
            } else {
                0.0
            };
        }
    }
}

/// Applies `transform` to every projection frame of a volume in parallel.
pub fn apply_to_volume<T: FrameTransform>(volume: &mut Array3<f32>, transform: &T) {
    volume
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|frame| transform.apply(frame));
}

/// Applies `transform` to every projection frame of a ready dataset.
///
/// # Errors
/// Returns an error if the dataset's last read did not succeed.
pub fn apply_frames<T: FrameTransform>(dataset: &mut Dataset, transform: &T) -> Result<()> {
    require_ready(dataset)?;
    let status = dataset.status();
    let data = dataset.data_f32_mut().ok_or(Error::NotReady(status))?;
    log::debug!(
        target: tomors_core::diagnostics::LOG_TARGET,
        "applying frame transform to {} frames",
        data.len_of(Axis(0))
    );
    apply_to_volume(data, transform);
    Ok(())
}
