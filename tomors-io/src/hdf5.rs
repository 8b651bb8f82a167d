//! HDF5 container backend.

use crate::container::{Container, ContainerOpener};
use crate::{Error, Result};
use hdf5::types::{FloatSize, H5Type, IntSize, TypeDescriptor};
use hdf5::{Dataset, File};
use ndarray::{s, Array3, ArrayD, Ix1, Ix3, IxDyn};
use std::path::Path;
use tomors_core::{NumericArray, Precision, Window};

/// Reads with the element type matching `$precision`, binding it to `$t`.
macro_rules! dispatch {
    ($precision:expr, $t:ident => $body:expr) => {
        match $precision {
            Precision::U8 => {
                type $t = u8;
                NumericArray::from($body)
            }
            Precision::U16 => {
                type $t = u16;
                NumericArray::from($body)
            }
            Precision::U32 => {
                type $t = u32;
                NumericArray::from($body)
            }
            Precision::I8 => {
                type $t = i8;
                NumericArray::from($body)
            }
            Precision::I16 => {
                type $t = i16;
                NumericArray::from($body)
            }
            Precision::I32 => {
                type $t = i32;
                NumericArray::from($body)
            }
            Precision::F32 => {
                type $t = f32;
                NumericArray::from($body)
            }
            Precision::F64 => {
                type $t = f64;
                NumericArray::from($body)
            }
        }
    };
}

/// An HDF5 file opened read-only. The file closes when this is dropped.
#[derive(Debug)]
pub struct Hdf5Container {
    file: File,
}

impl Hdf5Container {
    /// Opens an HDF5 file read-only.
    ///
    /// # Errors
    /// Returns an error if the file is not a readable HDF5 file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self { file })
    }

    fn dataset(&self, path: &str) -> Result<Dataset> {
        if !self.file.link_exists(path) {
            return Err(Error::MissingNode(path.to_string()));
        }
        Ok(self.file.dataset(path)?)
    }
}

impl Container for Hdf5Container {
    fn contains_group(&self, path: &str) -> bool {
        self.file.link_exists(path) && self.file.group(path).is_ok()
    }

    fn contains_dataset(&self, path: &str) -> bool {
        self.file.link_exists(path) && self.file.dataset(path).is_ok()
    }

    fn shape(&self, path: &str) -> Result<Vec<usize>> {
        Ok(self.dataset(path)?.shape())
    }

    fn read_volume(&self, path: &str, window: &[Window; 3]) -> Result<NumericArray<Ix3>> {
        let dataset = self.dataset(path)?;
        let precision = precision_of(&dataset, path)?;
        Ok(dispatch!(precision, T => read_volume_as::<T>(&dataset, path, window)?))
    }

    fn read_vector(&self, path: &str, window: Window) -> Result<NumericArray<Ix1>> {
        let dataset = self.dataset(path)?;
        let precision = precision_of(&dataset, path)?;
        let shape = dataset.shape();
        if shape.len() > 1 {
            return Err(Error::InvalidFormat(format!(
                "{path} must have at most one axis, found {}",
                shape.len()
            )));
        }
        let values = dispatch!(precision, T => {
            ArrayD::from_shape_vec(IxDyn(&shape), dataset.read_raw::<T>()?)?
        });
        Ok(values.slice_vector(window)?)
    }
}

/// Opens [`Hdf5Container`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Opener;

impl ContainerOpener for Hdf5Opener {
    type Container = Hdf5Container;

    fn open(&self, path: &Path) -> Result<Hdf5Container> {
        Hdf5Container::open(path)
    }
}

fn precision_of(dataset: &Dataset, path: &str) -> Result<Precision> {
    let descriptor = dataset.dtype()?.to_descriptor()?;
    let precision = match descriptor {
        TypeDescriptor::Unsigned(IntSize::U1) => Precision::U8,
        TypeDescriptor::Unsigned(IntSize::U2) => Precision::U16,
        TypeDescriptor::Unsigned(IntSize::U4) => Precision::U32,
        TypeDescriptor::Integer(IntSize::U1) => Precision::I8,
        TypeDescriptor::Integer(IntSize::U2) => Precision::I16,
        TypeDescriptor::Integer(IntSize::U4) => Precision::I32,
        TypeDescriptor::Float(FloatSize::U4) => Precision::F32,
        // 64-bit integers and any other float width widen to f64.
        TypeDescriptor::Unsigned(_) | TypeDescriptor::Integer(_) | TypeDescriptor::Float(_) => {
            Precision::F64
        }
        other => {
            return Err(Error::UnsupportedType {
                path: path.to_string(),
                dtype: format!("{other:?}"),
            })
        }
    };
    Ok(precision)
}

fn read_volume_as<T: H5Type>(
    dataset: &Dataset,
    path: &str,
    window: &[Window; 3],
) -> Result<Array3<T>> {
    let shape = dataset.shape();
    if shape.len() != 3 {
        return Err(Error::InvalidFormat(format!(
            "{path} must be 3-D, found {} axes",
            shape.len()
        )));
    }
    let p = window[0].clamp_to(shape[0])?;
    let r = window[1].clamp_to(shape[1])?;
    let c = window[2].clamp_to(shape[2])?;
    if p.is_empty() || r.is_empty() || c.is_empty() {
        return Ok(Array3::from_shape_vec((p.len(), r.len(), c.len()), Vec::new())?);
    }
    let (ps, rs, cs) = (p.stride()?, r.stride()?, c.stride()?);
    Ok(dataset.read_slice::<T, _, Ix3>(s![
        p.start..p.end;ps,
        r.start..r.end;rs,
        c.start..c.end;cs
    ])?)
}
