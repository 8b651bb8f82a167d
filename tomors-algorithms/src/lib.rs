//! tomors-algorithms: Downstream drivers over ingested datasets.
//!
//! Both drivers accept only a dataset whose last read succeeded, so every
//! array they see is present and single precision:
//! - **Frame transforms** - per-frame operations such as adaptive
//!   thresholding, run in parallel over projections
//! - **Center sweep** - reconstructs one slice at a range of candidate
//!   rotation centers and writes each image for visual inspection
//!
#![warn(missing_docs)]

mod center;
mod error;
mod segment;

pub use center::{BackProjector, CenterSweep, Reconstructor};
pub use error::{Error, Result};
pub use segment::{
    apply_frames, apply_to_volume, AdaptiveSegmentParams, AdaptiveThreshold, FrameTransform,
};

use tomors_core::Dataset;

/// Fails unless the dataset's last read succeeded.
fn require_ready(dataset: &Dataset) -> Result<()> {
    if dataset.is_ready() {
        Ok(())
    } else {
        Err(Error::NotReady(dataset.status()))
    }
}
