//! Rotation-center diagnostic sweep.
//!
//! Reconstructs one slice at every candidate center and writes each image
//! as `<center>.tif`, so the sharpest reconstruction can be picked by eye.

use crate::{require_ready, Error, Result};
use image::{ImageBuffer, Luma};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use tomors_core::diagnostics::LOG_TARGET;
use tomors_core::Dataset;

/// Half-width of the default center range, in pixels.
const DEFAULT_HALF_RANGE: f32 = 20.0;

/// Upper bound on the candidates of one sweep.
const MAX_CANDIDATES: usize = 100_000;

/// Reconstructs a single slice from its sinogram.
pub trait Reconstructor: Sync {
    /// Reconstructs a (projection, pixel) sinogram into a square
    /// (pixel, pixel) image, with the rotation axis at detector position
    /// `center`. Angles are in degrees.
    fn reconstruct(
        &self,
        sinogram: ArrayView2<'_, f32>,
        theta: ArrayView1<'_, f32>,
        center: f32,
    ) -> Array2<f32>;
}

/// Unfiltered parallel-beam back projection with linear interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackProjector;

impl Reconstructor for BackProjector {
    #[allow(clippy::cast_precision_loss)]
    fn reconstruct(
        &self,
        sinogram: ArrayView2<'_, f32>,
        theta: ArrayView1<'_, f32>,
        center: f32,
    ) -> Array2<f32> {
        let pixels = sinogram.len_of(Axis(1));
        let mut image = Array2::zeros((pixels, pixels));
        let trig: Vec<(f32, f32)> = theta
            .iter()
            .map(|deg| {
                let rad = deg.to_radians();
                (rad.cos(), rad.sin())
            })
            .collect();
        let used = trig.len().min(sinogram.len_of(Axis(0)));
        if used == 0 {
            return image;
        }

        let mid = (pixels as f32 - 1.0) / 2.0;
        let scale = PI / used as f32;
        for ((row, col), value) in image.indexed_iter_mut() {
            let x = col as f32 - mid;
            let y = mid - row as f32;
            let sum: f32 = sinogram
                .outer_iter()
                .zip(&trig)
                .map(|(profile, &(cos, sin))| sample(profile, x * cos + y * sin + center))
                .sum();
            *value = sum * scale;
        }
        image
    }
}

/// Linear interpolation of `profile` at fractional position `t`; zero
/// outside the detector.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn sample(profile: ArrayView1<'_, f32>, t: f32) -> f32 {
    let len = profile.len();
    if len == 0 || t < 0.0 || t > (len - 1) as f32 {
        return 0.0;
    }
    let i = t.floor() as usize;
    if i + 1 >= len {
        return profile[len - 1];
    }
    let frac = t - i as f32;
    profile[i] * (1.0 - frac) + profile[i + 1] * frac
}

/// Parameters of a center sweep. Unset values fall back to defaults
/// derived from the data shape.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CenterSweep {
    /// Slice to reconstruct; defaults to the middle slice.
    pub slice: Option<usize>,
    /// First candidate; defaults to 20 pixels left of the detector middle.
    pub center_start: Option<f32>,
    /// Exclusive end of the candidates; defaults to 20 pixels right of the
    /// detector middle.
    pub center_end: Option<f32>,
    /// Distance between candidates; defaults to 1.
    pub center_step: Option<f32>,
}

impl CenterSweep {
    /// Create a sweep with every parameter defaulted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slice to reconstruct.
    #[must_use]
    pub fn with_slice(mut self, slice: usize) -> Self {
        self.slice = Some(slice);
        self
    }

    /// Set the candidate range.
    #[must_use]
    pub fn with_centers(mut self, start: Option<f32>, end: Option<f32>, step: Option<f32>) -> Self {
        self.center_start = start;
        self.center_end = end;
        self.center_step = step;
        self
    }

    /// Candidate centers `start, start + step, ...` below `end` for a
    /// detector `pixels` wide.
    ///
    /// # Errors
    /// Returns an error if the step is not positive and finite, a bound is
    /// not finite, or the range holds more than 100 000 candidates.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn candidate_centers(&self, pixels: usize) -> Result<Vec<f32>> {
        let mid = (pixels / 2) as f32;
        let start = self.center_start.unwrap_or(mid - DEFAULT_HALF_RANGE);
        let end = self.center_end.unwrap_or(mid + DEFAULT_HALF_RANGE);
        let step = self.center_step.unwrap_or(1.0);
        if !(step.is_finite() && step > 0.0) {
            return Err(Error::ConfigError(format!(
                "center_step must be positive, got {step}"
            )));
        }
        if !(start.is_finite() && end.is_finite()) {
            return Err(Error::ConfigError(format!(
                "center range must be finite, got {start}..{end}"
            )));
        }
        if end <= start {
            return Ok(Vec::new());
        }
        let count = ((end - start) / step).ceil();
        if count > MAX_CANDIDATES as f32 {
            return Err(Error::ConfigError(format!(
                "center range {start}..{end} step {step} exceeds {MAX_CANDIDATES} candidates"
            )));
        }
        let count = count as usize;
        Ok((0..count)
            .map(|i| start + i as f32 * step)
            .filter(|&center| center < end)
            .collect())
    }

    /// Reconstructs the chosen slice at every candidate center and writes
    /// `<dir>/<center>.tif` as 16-bit grayscale, in parallel.
    ///
    /// Returns the written paths in candidate order.
    ///
    /// # Errors
    /// Returns an error if the dataset is not ready, the slice is out of
    /// range, the step is invalid, or an image cannot be written.
    pub fn run<R: Reconstructor>(
        &self,
        dataset: &Dataset,
        reconstructor: &R,
        dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        require_ready(dataset)?;
        let not_ready = || Error::NotReady(dataset.status());
        let data = dataset.data_f32().ok_or_else(not_ready)?;
        let theta = dataset.theta_f32().ok_or_else(not_ready)?;

        let (_, slices, pixels) = data.dim();
        let slice = self.slice.unwrap_or(slices / 2);
        if slice >= slices {
            return Err(Error::ConfigError(format!(
                "slice {slice} out of range for {slices} slices"
            )));
        }
        let centers = self.candidate_centers(pixels)?;
        let sinogram = data.index_axis(Axis(1), slice);
        std::fs::create_dir_all(dir)?;
        log::info!(
            target: LOG_TARGET,
            "center sweep: slice {slice}, {} candidates into {}",
            centers.len(),
            dir.display()
        );

        centers
            .par_iter()
            .map(|&center| {
                let image = reconstructor.reconstruct(sinogram, theta.view(), center);
                let path = dir.join(format!("{center}.tif"));
                write_tiff16(&image, &path)?;
                Ok(path)
            })
            .collect()
    }
}

/// Writes `image` as a 16-bit grayscale TIFF, stretching its range to the
/// full `u16` scale. A constant image is written as zeros.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn write_tiff16(image: &Array2<f32>, path: &Path) -> Result<()> {
    let (height, width) = image.dim();
    let (min, max) = image
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let scale = if max > min {
        f32::from(u16::MAX) / (max - min)
    } else {
        0.0
    };
    let pixels: Vec<u16> = image
        .iter()
        .map(|&v| ((v - min) * scale).round().clamp(0.0, f32::from(u16::MAX)) as u16)
        .collect();

    let dimension = |len: usize| {
        u32::try_from(len).map_err(|_| Error::ConfigError(format!("image side {len} too large")))
    };
    let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
        dimension(width)?,
        dimension(height)?,
        pixels,
    )
    .ok_or_else(|| Error::ConfigError("image buffer size mismatch".to_string()))?;
    buffer.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use tempfile::tempdir;

    fn point_sinogram(projections: usize, pixels: usize) -> (Array2<f32>, Array1<f32>) {
        let mut sinogram = Array2::zeros((projections, pixels));
        sinogram.column_mut(pixels / 2).fill(1.0);
        let theta = Array1::linspace(0.0, 180.0, projections + 1);
        (sinogram, theta.slice(ndarray::s![..projections]).to_owned())
    }

    fn argmax(image: &Array2<f32>) -> (usize, usize) {
        image
            .indexed_iter()
            .fold(((0, 0), f32::NEG_INFINITY), |best, (idx, &v)| {
                if v > best.1 {
                    (idx, v)
                } else {
                    best
                }
            })
            .0
    }

    #[test]
    fn default_candidates_surround_detector_middle() {
        let centers = CenterSweep::new().candidate_centers(64).unwrap();
        assert_eq!(centers.len(), 40);
        assert_relative_eq!(centers[0], 12.0);
        assert_relative_eq!(centers[39], 51.0);
    }

    #[test]
    fn candidates_honor_fractional_step() {
        let sweep = CenterSweep::new().with_centers(Some(10.0), Some(12.0), Some(0.5));
        assert_eq!(sweep.candidate_centers(32).unwrap(), vec![10.0, 10.5, 11.0, 11.5]);
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let sweep = CenterSweep::new().with_centers(None, None, Some(0.0));
        assert!(sweep.candidate_centers(32).is_err());
        let sweep = CenterSweep::new().with_centers(Some(5.0), Some(5.0), None);
        assert!(sweep.candidate_centers(32).unwrap().is_empty());
    }

    #[test]
    fn unbounded_range_is_rejected() {
        let sweep = CenterSweep::new().with_centers(None, Some(f32::INFINITY), None);
        assert!(matches!(
            sweep.candidate_centers(32),
            Err(Error::ConfigError(_))
        ));
        let sweep = CenterSweep::new().with_centers(Some(f32::NAN), None, None);
        assert!(sweep.candidate_centers(32).is_err());
        let sweep = CenterSweep::new().with_centers(Some(0.0), Some(1.0e12), Some(1.0));
        assert!(sweep.candidate_centers(32).is_err());
    }

    #[test]
    fn point_object_peaks_at_true_center() {
        let (sinogram, theta) = point_sinogram(90, 33);
        let image = BackProjector.reconstruct(sinogram.view(), theta.view(), 16.0);
        assert_eq!(image.dim(), (33, 33));
        assert_eq!(argmax(&image), (16, 16));
        assert_relative_eq!(image[[16, 16]], PI, epsilon = 1e-4);
    }

    #[test]
    fn wrong_center_blurs_the_point() {
        let (sinogram, theta) = point_sinogram(90, 33);
        let sharp = BackProjector.reconstruct(sinogram.view(), theta.view(), 16.0);
        let blurred = BackProjector.reconstruct(sinogram.view(), theta.view(), 20.0);
        let peak = |image: &Array2<f32>| image.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(peak(&blurred) < peak(&sharp));
    }

    #[test]
    fn sample_interpolates_and_clips() {
        let profile = Array1::from(vec![0.0f32, 2.0, 4.0]);
        assert_relative_eq!(sample(profile.view(), 0.5), 1.0);
        assert_relative_eq!(sample(profile.view(), 2.0), 4.0);
        assert_relative_eq!(sample(profile.view(), -0.1), 0.0);
        assert_relative_eq!(sample(profile.view(), 2.1), 0.0);
    }

    #[test]
    fn tiff_output_uses_full_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("12.5.tif");
        let image = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32);
        write_tiff16(&image, &path).unwrap();

        let decoded = image::open(&path).unwrap().into_luma16();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(0, 0)[0], 0);
        assert_eq!(decoded.get_pixel(3, 2)[0], u16::MAX);
    }
}
