//! Slicing windows over on-disk arrays.
//!
//! Requested bounds ([`SliceParams`]) are optional per axis. They are resolved
//! against the on-disk shapes of the fields that passed validation into a
//! [`ResolvedWindow`]: an unset start becomes 0, an unset end becomes the axis
//! length and an unset step becomes 1. Slice and pixel windows are shared by
//! the projection data and both reference fields; only the leading shot axis
//! of the white and dark fields has its own (start, end) range.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A resolved half-open, strided range along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl Window {
    /// Creates a window.
    #[must_use]
    pub fn new(start: usize, end: usize, step: usize) -> Self {
        Self { start, end, step }
    }

    /// The window covering a whole axis of length `len` with step 1.
    #[must_use]
    pub fn full(len: usize) -> Self {
        Self::new(0, len, 1)
    }

    /// Clamps the window to an axis of length `len`.
    ///
    /// Follows slice semantics: `end` is clamped to `len` and `start` to
    /// `end`, so out-of-range windows select fewer (or zero) elements.
    ///
    /// # Errors
    /// Returns an error if the step is zero.
    pub fn clamp_to(&self, len: usize) -> Result<Self> {
        if self.step == 0 {
            return Err(Error::InvalidWindow("step must be at least 1".to_string()));
        }
        let end = self.end.min(len);
        Ok(Self {
            start: self.start.min(end),
            end,
            step: self.step,
        })
    }

    /// Number of indices selected by the window.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.step == 0 {
            return 0;
        }
        self.end.saturating_sub(self.start).div_ceil(self.step)
    }

    /// Returns true if the window selects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Step as a signed stride, as used by `ndarray` and HDF5 hyperslabs.
    ///
    /// # Errors
    /// Returns an error if the step does not fit in `isize`.
    pub fn stride(&self) -> Result<isize> {
        isize::try_from(self.step)
            .map_err(|_| Error::InvalidWindow(format!("step {} is too large", self.step)))
    }
}

/// Optional (start, end, step) for one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub step: Option<usize>,
}

impl AxisRange {
    /// Creates an axis range from optional bounds.
    #[must_use]
    pub fn new(start: Option<usize>, end: Option<usize>, step: Option<usize>) -> Self {
        Self { start, end, step }
    }

    /// Fills unset bounds from an axis of length `len`.
    #[must_use]
    pub fn resolve(&self, len: usize) -> Window {
        Window {
            start: self.start.unwrap_or(0),
            end: self.end.unwrap_or(len),
            step: self.step.unwrap_or(1),
        }
    }
}

/// Optional (start, end) over reference shots. Shots are never strided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShotRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl ShotRange {
    /// Creates a shot range from optional bounds.
    #[must_use]
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Fills unset bounds from a shot axis of length `len`.
    #[must_use]
    pub fn resolve(&self, len: usize) -> Window {
        Window {
            start: self.start.unwrap_or(0),
            end: self.end.unwrap_or(len),
            step: 1,
        }
    }
}

/// Requested slicing parameters for a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SliceParams {
    pub projections: AxisRange,
    pub slices: AxisRange,
    pub pixels: AxisRange,
    pub white: ShotRange,
    pub dark: ShotRange,
}

impl SliceParams {
    /// Set the projection range.
    #[must_use]
    pub fn with_projections(
        mut self,
        start: Option<usize>,
        end: Option<usize>,
        step: Option<usize>,
    ) -> Self {
        self.projections = AxisRange::new(start, end, step);
        self
    }

    /// Set the slice (row) range.
    #[must_use]
    pub fn with_slices(
        mut self,
        start: Option<usize>,
        end: Option<usize>,
        step: Option<usize>,
    ) -> Self {
        self.slices = AxisRange::new(start, end, step);
        self
    }

    /// Set the pixel (column) range.
    #[must_use]
    pub fn with_pixels(
        mut self,
        start: Option<usize>,
        end: Option<usize>,
        step: Option<usize>,
    ) -> Self {
        self.pixels = AxisRange::new(start, end, step);
        self
    }

    /// Set the white-field shot range.
    #[must_use]
    pub fn with_white(mut self, start: Option<usize>, end: Option<usize>) -> Self {
        self.white = ShotRange::new(start, end);
        self
    }

    /// Set the dark-field shot range.
    #[must_use]
    pub fn with_dark(mut self, start: Option<usize>, end: Option<usize>) -> Self {
        self.dark = ShotRange::new(start, end);
        self
    }

    /// Resolves the request against on-disk shapes.
    ///
    /// `white_shots` and `dark_shots` are the leading-axis lengths of the
    /// reference fields, given only for fields that passed validation.
    #[must_use]
    pub fn resolve(
        &self,
        data_shape: [usize; 3],
        white_shots: Option<usize>,
        dark_shots: Option<usize>,
    ) -> ResolvedWindow {
        ResolvedWindow {
            projections: self.projections.resolve(data_shape[0]),
            slices: self.slices.resolve(data_shape[1]),
            pixels: self.pixels.resolve(data_shape[2]),
            white: white_shots.map(|len| self.white.resolve(len)),
            dark: dark_shots.map(|len| self.dark.resolve(len)),
        }
    }
}

/// Fully resolved slicing window of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResolvedWindow {
    pub projections: Window,
    pub slices: Window,
    pub pixels: Window,
    pub white: Option<Window>,
    pub dark: Option<Window>,
}

impl ResolvedWindow {
    /// Window over the projection data (projection, slice, pixel).
    #[must_use]
    pub fn data(&self) -> [Window; 3] {
        [self.projections, self.slices, self.pixels]
    }

    /// Window over the white field, if it is read from file.
    #[must_use]
    pub fn white(&self) -> Option<[Window; 3]> {
        self.white.map(|shots| [shots, self.slices, self.pixels])
    }

    /// Window over the dark field, if it is read from file.
    #[must_use]
    pub fn dark(&self) -> Option<[Window; 3]> {
        self.dark.map(|shots| [shots, self.slices, self.pixels])
    }
}
