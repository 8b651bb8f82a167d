//! Reading Data Exchange files into a [`Dataset`].
//!
//! A read validates the file, resolves the slicing window against the
//! fields that passed validation, reads what the file offers, synthesizes
//! the auxiliary fields it lacks and hands everything to the dataset, which
//! normalizes it to `f32`. A file that fails the terminal checks leaves the
//! dataset rejected with no field retained.

use crate::container::{Container, ContainerOpener};
use crate::validator::{check_file, check_layout, file_rejected};
use crate::Result;
use ndarray::Ix3;
use std::path::{Path, PathBuf};
use tomors_core::synth::{reference_frame, rotation_angles};
use tomors_core::{
    Dataset, Diagnostic, DiagnosticLog, FieldKind, Materialized, MaterializedFields, NumericArray,
    ResolvedWindow, Severity, SliceParams, ValidationReport, Window,
};

/// Options of one read.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Requested slicing window; unset bounds cover the whole axis.
    pub window: SliceParams,
    /// Diagnostic threshold name (`DEBUG`, `INFO`, `WARNING`, `ERROR`).
    pub log_level: Option<String>,
}

impl ReadOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slicing window.
    #[must_use]
    pub fn with_window(mut self, window: SliceParams) -> Self {
        self.window = window;
        self
    }

    /// Set the diagnostic threshold.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }
}

/// Reads Data Exchange files through a [`ContainerOpener`].
#[derive(Debug, Clone, Default)]
pub struct Reader<O> {
    opener: O,
}

impl<O: ContainerOpener> Reader<O> {
    /// Create a reader backed by `opener`.
    pub fn new(opener: O) -> Self {
        Self { opener }
    }

    /// The backing opener.
    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Validates `path` without reading any array.
    ///
    /// # Errors
    /// Returns an error if the container cannot be opened or queried.
    pub fn validate(&self, path: &Path, log: &mut DiagnosticLog) -> Result<ValidationReport> {
        crate::validator::validate(&self.opener, &absolute(path), log)
    }

    /// Reads `path` into `dataset`.
    ///
    /// A file that fails validation is not an error: the dataset ends up
    /// [`tomors_core::IngestStatus::Rejected`] and its diagnostics say why.
    /// Reading the same file again with the same options yields the same
    /// arrays and flags.
    ///
    /// # Errors
    /// Returns an error if a file that passed validation cannot be opened or
    /// read, or if the requested window cannot be applied. The dataset is
    /// then left [`tomors_core::IngestStatus::Rejected`] with no fields.
    pub fn read(&self, dataset: &mut Dataset, path: &Path, options: &ReadOptions) -> Result<()> {
        let path = absolute(path);
        dataset.begin_read(&path, options.log_level.as_deref(), options.window);
        if let Err(err) = self.ingest(dataset, &path, options) {
            dataset.abort(&err);
            return Err(err);
        }
        Ok(())
    }

    fn ingest(&self, dataset: &mut Dataset, path: &Path, options: &ReadOptions) -> Result<()> {
        let status = check_file(path, dataset.log_mut());
        dataset.record_source(path);
        if !status.is_valid() {
            let report = file_rejected(status, dataset.log_mut());
            dataset.reject(report);
            return Ok(());
        }

        let container = self.opener.open(path)?;
        let report = check_layout(&container, dataset.log_mut())?;
        let Some(data_shape) = report.data_shape() else {
            dataset.reject(report);
            return Ok(());
        };

        let shots = |kind| report.valid_shape(kind).map(|shape: &[usize]| shape[0]);
        let window = options.window.resolve(
            data_shape,
            shots(FieldKind::White),
            shots(FieldKind::Dark),
        );
        let fields = materialize(&container, &report, &window, dataset.log_mut())?;
        drop(container);

        dataset.install(report, window, fields);
        Ok(())
    }
}

#[cfg(feature = "hdf5")]
impl Reader<crate::hdf5::Hdf5Opener> {
    /// A reader for HDF5 files.
    #[must_use]
    pub fn hdf5() -> Self {
        Self::new(crate::hdf5::Hdf5Opener)
    }
}

/// Reads an HDF5 Data Exchange file into a new dataset.
///
/// # Errors
/// Returns an error if a file that passed validation cannot be read.
#[cfg(feature = "hdf5")]
pub fn read_exchange<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Dataset> {
    let mut dataset = Dataset::new();
    Reader::hdf5().read(&mut dataset, path.as_ref(), options)?;
    Ok(dataset)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn materialize<C: Container>(
    container: &C,
    report: &ValidationReport,
    window: &ResolvedWindow,
    log: &mut DiagnosticLog,
) -> Result<MaterializedFields> {
    let data = container.read_volume(FieldKind::Data.path(), &window.data())?;
    log.emit(Diagnostic::ok(Severity::Info, "read data from file"));

    let white = reference_field(container, FieldKind::White, window.white(), &data, log)?;
    let dark = reference_field(container, FieldKind::Dark, window.dark(), &data, log)?;

    let theta = if report.theta.is_valid() {
        let theta = container.read_vector(FieldKind::Theta.path(), window.projections)?;
        log.emit(Diagnostic::ok(Severity::Info, "read theta from file"));
        Materialized::from_file(theta)
    } else {
        log.emit(Diagnostic::ok(
            Severity::Warning,
            "theta: assign 180-degree rotation",
        ));
        Materialized::synthetic(rotation_angles(data.shape()[0]))
    };

    Ok(MaterializedFields {
        data,
        white,
        dark,
        theta,
    })
}

/// Reads a white or dark field, or falls back to a frame of the data mean.
fn reference_field<C: Container>(
    container: &C,
    kind: FieldKind,
    window: Option<[Window; 3]>,
    data: &NumericArray<Ix3>,
    log: &mut DiagnosticLog,
) -> Result<Materialized<Ix3>> {
    if let Some(window) = window {
        let array = container.read_volume(kind.path(), &window)?;
        log.emit(Diagnostic::ok(
            Severity::Info,
            format!("read {kind} from file"),
        ));
        return Ok(Materialized::from_file(array));
    }
    log.emit(Diagnostic::ok(
        Severity::Warning,
        format!("auto-normalization: {kind} set to mean of data"),
    ));
    Ok(Materialized::synthetic(reference_frame(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryContainer, MemoryOpener};
    use ndarray::{Array1, Array3};
    use std::fs::File;
    use tempfile::tempdir;
    use tomors_core::{IngestStatus, Origin};

    #[test]
    fn read_retains_file_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.h5");
        File::create(&path).unwrap();
        let container = MemoryContainer::new()
            .with_dataset("exchange/data", Array3::<u16>::ones((3, 2, 2)))
            .with_dataset("exchange/data_white", Array3::<u16>::ones((2, 2, 2)))
            .with_dataset("exchange/data_dark", Array3::<u16>::zeros((1, 2, 2)))
            .with_dataset("exchange/theta", Array1::<f64>::zeros(3));
        let reader = Reader::new(MemoryOpener::new(container));

        let mut dataset = Dataset::new();
        reader.read(&mut dataset, &path, &ReadOptions::new()).unwrap();

        assert_eq!(dataset.status(), IngestStatus::Ready);
        for kind in FieldKind::ALL {
            assert_eq!(dataset.state(kind).origin, Some(Origin::File), "{kind}");
        }
        assert_eq!(dataset.white_f32().unwrap().dim(), (2, 2, 2));
        assert_eq!(reader.opener().open_count(), 1);
    }

    #[test]
    fn reader_validate_reports_without_reading() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.h5");
        File::create(&path).unwrap();
        let reader = Reader::new(MemoryOpener::new(MemoryContainer::new()));
        let mut log = DiagnosticLog::new(Severity::Debug);

        let report = reader.validate(&path, &mut log).unwrap();
        assert!(!report.file_check());
    }
}
