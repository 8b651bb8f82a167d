//! In-memory containers.
//!
//! Useful for exercising validation and ingestion without an HDF5 file, and
//! for feeding arrays produced elsewhere through the same pipeline.

use crate::container::{Container, ContainerOpener};
use crate::{Error, Result};
use ndarray::{Array, Dimension, Ix1, Ix3, IxDyn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tomors_core::{NumericArray, Window};

/// A container whose groups and datasets live in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    groups: BTreeSet<String>,
    datasets: BTreeMap<String, NumericArray<IxDyn>>,
}

impl MemoryContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty group and its parents.
    #[must_use]
    pub fn with_group(mut self, path: &str) -> Self {
        self.add_parents(&format!("{}/", path.trim_matches('/')));
        self
    }

    /// Adds a dataset, creating its parent groups.
    #[must_use]
    pub fn with_dataset<T, D>(self, path: &str, array: Array<T, D>) -> Self
    where
        D: Dimension,
        NumericArray<D>: From<Array<T, D>>,
    {
        self.with_numeric(path, NumericArray::from(array))
    }

    /// Adds an already tagged dataset, creating its parent groups.
    #[must_use]
    pub fn with_numeric<D: Dimension>(mut self, path: &str, array: NumericArray<D>) -> Self {
        let path = path.trim_matches('/');
        self.add_parents(path);
        self.datasets.insert(path.to_string(), array.into_dyn());
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut prefix = String::new();
        let mut parts = path.split('/').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                break;
            }
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            self.groups.insert(prefix.clone());
        }
    }

    fn dataset(&self, path: &str) -> Result<&NumericArray<IxDyn>> {
        self.datasets
            .get(path.trim_matches('/'))
            .ok_or_else(|| Error::MissingNode(path.to_string()))
    }
}

impl Container for MemoryContainer {
    fn contains_group(&self, path: &str) -> bool {
        self.groups.contains(path.trim_matches('/'))
    }

    fn contains_dataset(&self, path: &str) -> bool {
        self.datasets.contains_key(path.trim_matches('/'))
    }

    fn shape(&self, path: &str) -> Result<Vec<usize>> {
        Ok(self.dataset(path)?.shape().to_vec())
    }

    fn read_volume(&self, path: &str, window: &[Window; 3]) -> Result<NumericArray<Ix3>> {
        Ok(self.dataset(path)?.slice_volume(window)?)
    }

    fn read_vector(&self, path: &str, window: Window) -> Result<NumericArray<Ix1>> {
        Ok(self.dataset(path)?.slice_vector(window)?)
    }
}

/// Hands out copies of one [`MemoryContainer`] for any path.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    container: MemoryContainer,
    opens: AtomicUsize,
}

impl MemoryOpener {
    #[must_use]
    pub fn new(container: MemoryContainer) -> Self {
        Self {
            container,
            opens: AtomicUsize::new(0),
        }
    }

    /// Number of times a container was opened.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }
}

impl ContainerOpener for MemoryOpener {
    type Container = MemoryContainer;

    fn open(&self, _path: &Path) -> Result<MemoryContainer> {
        self.opens.fetch_add(1, Ordering::Relaxed);
        Ok(self.container.clone())
    }
}
