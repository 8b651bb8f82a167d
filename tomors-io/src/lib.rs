//! tomors-io: Data Exchange file validation and ingestion for tomors.
//!
//! This crate checks files against the Data Exchange layout, reads the
//! projection, reference and angle arrays through a [`Container`] and fills
//! a [`tomors_core::Dataset`]. The HDF5 backend is behind the `hdf5`
//! feature; [`MemoryContainer`] serves tests and in-memory pipelines.
//!

pub mod container;
mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod memory;
pub mod reader;
pub mod validator;

pub use container::{Container, ContainerOpener};
pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use hdf5::{Hdf5Container, Hdf5Opener};
pub use memory::{MemoryContainer, MemoryOpener};
#[cfg(feature = "hdf5")]
pub use reader::read_exchange;
pub use reader::{ReadOptions, Reader};
pub use validator::{check_file, check_layout, validate};
