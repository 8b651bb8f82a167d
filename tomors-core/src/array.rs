//! Numeric arrays of any supported element type, and their normalization
//! to single precision.

use crate::window::Window;
use crate::{Error, Result};
use ndarray::{s, Array, Array1, ArrayD, Dimension, Ix1, Ix3, IxDyn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Element precision of a [`NumericArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Precision {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// An owned n-dimensional array tagged with its element type.
///
/// Detector frames usually arrive as unsigned integers while angles are
/// stored as doubles; everything is carried in its native type until
/// [`NumericArray::into_f32`] normalizes it.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericArray<D: Dimension> {
    U8(Array<u8, D>),
    U16(Array<u16, D>),
    U32(Array<u32, D>),
    I8(Array<i8, D>),
    I16(Array<i16, D>),
    I32(Array<i32, D>),
    F32(Array<f32, D>),
    F64(Array<f64, D>),
}

/// Applies `$body` to the inner array of every variant, rewrapping the
/// result in the same variant.
macro_rules! map_variants {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            NumericArray::U8($arr) => NumericArray::U8($body),
            NumericArray::U16($arr) => NumericArray::U16($body),
            NumericArray::U32($arr) => NumericArray::U32($body),
            NumericArray::I8($arr) => NumericArray::I8($body),
            NumericArray::I16($arr) => NumericArray::I16($body),
            NumericArray::I32($arr) => NumericArray::I32($body),
            NumericArray::F32($arr) => NumericArray::F32($body),
            NumericArray::F64($arr) => NumericArray::F64($body),
        }
    };
}

/// Applies `$body` to the inner array of every variant.
macro_rules! with_variant {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            NumericArray::U8($arr) => $body,
            NumericArray::U16($arr) => $body,
            NumericArray::U32($arr) => $body,
            NumericArray::I8($arr) => $body,
            NumericArray::I16($arr) => $body,
            NumericArray::I32($arr) => $body,
            NumericArray::F32($arr) => $body,
            NumericArray::F64($arr) => $body,
        }
    };
}

macro_rules! impl_from_array {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<D: Dimension> From<Array<$ty, D>> for NumericArray<D> {
                fn from(array: Array<$ty, D>) -> Self {
                    Self::$variant(array)
                }
            }
        )*
    };
}

impl_from_array!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    f32 => F32,
    f64 => F64,
);

impl<D: Dimension> NumericArray<D> {
    /// Element precision.
    #[must_use]
    pub fn precision(&self) -> Precision {
        match self {
            Self::U8(_) => Precision::U8,
            Self::U16(_) => Precision::U16,
            Self::U32(_) => Precision::U32,
            Self::I8(_) => Precision::I8,
            Self::I16(_) => Precision::I16,
            Self::I32(_) => Precision::I32,
            Self::F32(_) => Precision::F32,
            Self::F64(_) => Precision::F64,
        }
    }

    /// Shape of the array.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        with_variant!(self, a => a.shape())
    }

    /// Number of axes.
    #[must_use]
    pub fn ndim(&self) -> usize {
        with_variant!(self, a => a.ndim())
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        with_variant!(self, a => a.len())
    }

    /// Returns true if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean of all elements, accumulated in `f64`.
    ///
    /// Returns `None` for an empty array.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = with_variant!(self, a => a.iter().map(|&v| f64::from(v)).sum());
        Some(sum / self.len() as f64)
    }

    /// Borrows the array if it is already single precision.
    #[must_use]
    pub fn as_f32(&self) -> Option<&Array<f32, D>> {
        match self {
            Self::F32(a) => Some(a),
            _ => None,
        }
    }

    /// Converts to single precision.
    ///
    /// An array that already is `f32` is moved out without copying.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn into_f32(self) -> Array<f32, D> {
        match self {
            Self::F32(a) => a,
            Self::F64(a) => a.mapv(|v| v as f32),
            Self::U32(a) => a.mapv(|v| v as f32),
            Self::I32(a) => a.mapv(|v| v as f32),
            Self::U8(a) => a.mapv(f32::from),
            Self::U16(a) => a.mapv(f32::from),
            Self::I8(a) => a.mapv(f32::from),
            Self::I16(a) => a.mapv(f32::from),
        }
    }

    /// Normalizes in place to single precision.
    pub fn normalize(&mut self) {
        if self.precision() == Precision::F32 {
            return;
        }
        let placeholder = Self::F32(Array::zeros(D::zeros(self.ndim())));
        let taken = std::mem::replace(self, placeholder);
        *self = Self::F32(taken.into_f32());
    }

    /// Converts to a dynamic-dimensional array.
    #[must_use]
    pub fn into_dyn(self) -> NumericArray<IxDyn> {
        map_variants!(self, a => a.into_dyn())
    }
}

impl NumericArray<IxDyn> {
    /// Converts to a fixed number of axes.
    ///
    /// # Errors
    /// Returns an error if the number of axes differs.
    pub fn into_dimensionality<D: Dimension>(self) -> Result<NumericArray<D>> {
        let found = self.ndim();
        if D::NDIM.is_some_and(|expected| expected != found) {
            return Err(Error::Dimensionality {
                expected: D::NDIM.unwrap_or(found),
                found,
            });
        }
        Ok(map_variants!(self, a => a.into_dimensionality::<D>()?))
    }

    /// Copies out a strided 3-D window.
    ///
    /// Bounds are clamped to the array's extent.
    ///
    /// # Errors
    /// Returns an error if the array is not 3-D or a window has a zero step.
    pub fn slice_volume(&self, window: &[Window; 3]) -> Result<NumericArray<Ix3>> {
        if self.ndim() != 3 {
            return Err(Error::Dimensionality {
                expected: 3,
                found: self.ndim(),
            });
        }
        let shape = self.shape();
        let p = window[0].clamp_to(shape[0])?;
        let r = window[1].clamp_to(shape[1])?;
        let c = window[2].clamp_to(shape[2])?;
        let (ps, rs, cs) = (p.stride()?, r.stride()?, c.stride()?);
        Ok(map_variants!(self, a => {
            a.view()
                .into_dimensionality::<Ix3>()?
                .slice(s![p.start..p.end;ps, r.start..r.end;rs, c.start..c.end;cs])
                .to_owned()
        }))
    }

    /// Copies out a strided 1-D window.
    ///
    /// A 0-D array is treated as a single-element vector.
    ///
    /// # Errors
    /// Returns an error if the array has more than one axis or the window
    /// has a zero step.
    pub fn slice_vector(&self, window: Window) -> Result<NumericArray<Ix1>> {
        if self.ndim() > 1 {
            return Err(Error::Dimensionality {
                expected: 1,
                found: self.ndim(),
            });
        }
        let w = window.clamp_to(self.len())?;
        let stride = w.stride()?;
        Ok(map_variants!(self, a => {
            let flat: Array1<_> = a.iter().copied().collect();
            flat.slice(s![w.start..w.end;stride]).to_owned()
        }))
    }
}

/// Builds a dynamic array from a shape and a flat buffer.
///
/// # Errors
/// Returns an error if the buffer length does not match the shape.
pub fn from_shape_vec<T>(shape: &[usize], values: Vec<T>) -> Result<NumericArray<IxDyn>>
where
    NumericArray<IxDyn>: From<ArrayD<T>>,
{
    Ok(ArrayD::from_shape_vec(IxDyn(shape), values)?.into())
}
