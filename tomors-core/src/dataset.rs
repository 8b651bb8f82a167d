//! The Data Exchange dataset and its lifecycle.

use crate::array::{NumericArray, Precision};
use crate::diagnostics::{Diagnostic, DiagnosticLog, Severity};
use crate::validity::{
    FieldKind, FieldState, FieldStatus, IngestStatus, Origin, ValidationReport, ValidityFlags,
};
use crate::window::{ResolvedWindow, SliceParams};
use chrono::Local;
use ndarray::{Array1, Array3, Dimension, Ix1, Ix3};
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Creation record of a dataset.
///
/// Date and time are taken at construction. The source path is recorded by
/// the first read and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Provenance {
    date: String,
    time: String,
    source: Option<PathBuf>,
}

impl Provenance {
    fn now() -> Self {
        let now = Local::now();
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            source: None,
        }
    }

    /// Creation date, `YYYY-mm-dd`.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Creation time, `HH:MM:SS`.
    #[must_use]
    pub fn time(&self) -> &str {
        &self.time
    }

    /// File the dataset was first read from.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Records the source path unless one is already set.
    ///
    /// Returns `false` if a different path was recorded earlier.
    fn record_source(&mut self, path: &Path) -> bool {
        match &self.source {
            Some(existing) => existing == path,
            None => {
                self.source = Some(path.to_path_buf());
                true
            }
        }
    }
}

/// An optional array together with its validity state.
#[derive(Debug, Clone)]
pub struct Field<D: Dimension> {
    array: Option<NumericArray<D>>,
    state: FieldState,
}

impl<D: Dimension> Field<D> {
    fn supplied(array: Option<NumericArray<D>>) -> Self {
        match array {
            Some(array) => Self {
                array: Some(array),
                state: FieldState::supplied(),
            },
            None => Self {
                array: None,
                state: FieldState::default(),
            },
        }
    }

    fn rejected(status: FieldStatus) -> Self {
        Self {
            array: None,
            state: FieldState {
                status,
                origin: None,
            },
        }
    }

    fn retained(status: FieldStatus, materialized: Materialized<D>) -> Self {
        Self {
            array: Some(materialized.array),
            state: FieldState {
                status,
                origin: Some(materialized.origin),
            },
        }
    }

    /// The retained array, if any.
    #[must_use]
    pub fn array(&self) -> Option<&NumericArray<D>> {
        self.array.as_ref()
    }

    /// Validation verdict and origin.
    #[must_use]
    pub fn state(&self) -> &FieldState {
        &self.state
    }

    fn normalize(&mut self) {
        if let Some(array) = self.array.as_mut() {
            array.normalize();
        }
    }
}

/// An array produced by the materializer, with where it came from.
#[derive(Debug, Clone)]
pub struct Materialized<D: Dimension> {
    pub array: NumericArray<D>,
    pub origin: Origin,
}

impl<D: Dimension> Materialized<D> {
    #[must_use]
    pub fn from_file(array: NumericArray<D>) -> Self {
        Self {
            array,
            origin: Origin::File,
        }
    }

    #[must_use]
    pub fn synthetic(array: NumericArray<D>) -> Self {
        Self {
            array,
            origin: Origin::Synthetic,
        }
    }
}

/// Every field of a successful read, before normalization.
#[derive(Debug, Clone)]
pub struct MaterializedFields {
    pub data: NumericArray<Ix3>,
    pub white: Materialized<Ix3>,
    pub dark: Materialized<Ix3>,
    pub theta: Materialized<Ix1>,
}

/// A tomography dataset: projections, flat and dark references and angles.
///
/// Axes of `data` are (projection, slice, pixel); `white` and `dark` are
/// (shot, slice, pixel); `theta` holds one angle in degrees per projection.
#[derive(Debug)]
pub struct Dataset {
    data: Field<Ix3>,
    white: Field<Ix3>,
    dark: Field<Ix3>,
    theta: Field<Ix1>,
    status: IngestStatus,
    recon_done: bool,
    provenance: Provenance,
    params: SliceParams,
    window: Option<ResolvedWindow>,
    log: DiagnosticLog,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset {
    /// Creates an empty dataset; every flag is false.
    #[must_use]
    pub fn new() -> Self {
        DatasetBuilder::default().build()
    }

    /// Starts building a dataset from in-memory arrays.
    #[must_use]
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    /// Projection data, axes (projection, slice, pixel).
    #[must_use]
    pub fn data(&self) -> Option<&NumericArray<Ix3>> {
        self.data.array()
    }

    /// White (flat) field, axes (shot, slice, pixel).
    #[must_use]
    pub fn white(&self) -> Option<&NumericArray<Ix3>> {
        self.white.array()
    }

    /// Dark field, axes (shot, slice, pixel).
    #[must_use]
    pub fn dark(&self) -> Option<&NumericArray<Ix3>> {
        self.dark.array()
    }

    /// Acquisition angles in degrees.
    #[must_use]
    pub fn theta(&self) -> Option<&NumericArray<Ix1>> {
        self.theta.array()
    }

    #[must_use]
    pub fn data_f32(&self) -> Option<&Array3<f32>> {
        self.data().and_then(NumericArray::as_f32)
    }

    #[must_use]
    pub fn white_f32(&self) -> Option<&Array3<f32>> {
        self.white().and_then(NumericArray::as_f32)
    }

    #[must_use]
    pub fn dark_f32(&self) -> Option<&Array3<f32>> {
        self.dark().and_then(NumericArray::as_f32)
    }

    #[must_use]
    pub fn theta_f32(&self) -> Option<&Array1<f32>> {
        self.theta().and_then(NumericArray::as_f32)
    }

    /// Mutable projection data, only once the dataset is ready.
    pub fn data_f32_mut(&mut self) -> Option<&mut Array3<f32>> {
        if self.status != IngestStatus::Ready {
            return None;
        }
        match self.data.array.as_mut() {
            Some(NumericArray::F32(array)) => Some(array),
            _ => None,
        }
    }

    /// Validation verdict and origin of one field.
    #[must_use]
    pub fn state(&self, kind: FieldKind) -> &FieldState {
        match kind {
            FieldKind::Data => self.data.state(),
            FieldKind::White => self.white.state(),
            FieldKind::Dark => self.dark.state(),
            FieldKind::Theta => self.theta.state(),
        }
    }

    /// Aggregate status.
    #[must_use]
    pub fn status(&self) -> IngestStatus {
        self.status
    }

    /// True once a read succeeded; every field is then present and `f32`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == IngestStatus::Ready
    }

    /// Boolean view of validity.
    #[must_use]
    pub fn validity(&self) -> ValidityFlags {
        ValidityFlags {
            data: self.data.state.is_usable(),
            white: self.white.state.is_usable(),
            dark: self.dark.state.is_usable(),
            theta: self.theta.state.is_usable(),
            file_check: self.status == IngestStatus::Ready,
            recon_done: self.recon_done,
        }
    }

    /// Flags the dataset as reconstructed.
    pub fn mark_reconstructed(&mut self) {
        self.recon_done = true;
    }

    #[must_use]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Slicing parameters requested by the last read.
    #[must_use]
    pub fn slice_params(&self) -> &SliceParams {
        &self.params
    }

    /// Window resolved by the last successful read.
    #[must_use]
    pub fn window(&self) -> Option<&ResolvedWindow> {
        self.window.as_ref()
    }

    /// Diagnostics of the last construction or read.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.log.entries()
    }

    /// The dataset's diagnostic sink.
    pub fn log_mut(&mut self) -> &mut DiagnosticLog {
        &mut self.log
    }

    /// Converts every retained array to `f32`.
    pub fn normalize(&mut self) {
        self.data.normalize();
        self.white.normalize();
        self.dark.normalize();
        self.theta.normalize();
        self.log
            .emit(Diagnostic::ok(Severity::Debug, "type normalization to f32"));
    }

    /// Prepares the dataset for reading `path`.
    ///
    /// Clears the diagnostics of the previous read, applies `level` (an
    /// unrecognized name keeps the current threshold) and attaches the log
    /// file that sits next to `path` with a `.log` extension.
    pub fn begin_read(&mut self, path: &Path, level: Option<&str>, params: SliceParams) {
        self.log.clear();
        if let Some(level) = level {
            self.log.set_level(level);
        }
        let log_path = path.with_extension("log");
        match self.log.attach_file(&log_path) {
            Ok(()) => self.log.emit(Diagnostic::ok(
                Severity::Info,
                format!("logger file: {}", log_path.display()),
            )),
            Err(err) => self.log.emit(Diagnostic::failed(
                Severity::Warning,
                format!("logger file: {} ({err})", log_path.display()),
            )),
        }
        self.params = params;
    }

    /// Records `path` as the dataset's source.
    pub fn record_source(&mut self, path: &Path) {
        if !self.provenance.record_source(path) {
            let recorded = self
                .provenance
                .source()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            self.log.emit(Diagnostic::failed(
                Severity::Warning,
                format!("provenance keeps first source {recorded}"),
            ));
        }
    }

    /// Discards every field after a failed validation.
    pub fn reject(&mut self, report: ValidationReport) {
        self.data = Field::rejected(report.data);
        self.white = Field::rejected(report.white);
        self.dark = Field::rejected(report.dark);
        self.theta = Field::rejected(report.theta);
        self.window = None;
        self.status = IngestStatus::Rejected;
        self.log.emit(Diagnostic::failed(
            Severity::Error,
            "dataset rejected, no field read",
        ));
    }

    /// Discards every field after a read that failed with an error.
    ///
    /// Leaves no trace of an earlier read: all fields become missing, the
    /// resolved window is cleared and the dataset is no longer ready.
    pub fn abort(&mut self, reason: impl std::fmt::Display) {
        self.reject(ValidationReport::default());
        self.log.emit(Diagnostic::failed(
            Severity::Error,
            format!("read aborted: {reason}"),
        ));
    }

    /// Installs the fields of a successful read and normalizes them.
    pub fn install(
        &mut self,
        report: ValidationReport,
        window: ResolvedWindow,
        fields: MaterializedFields,
    ) {
        self.data = Field::retained(report.data, Materialized::from_file(fields.data));
        self.white = Field::retained(report.white, fields.white);
        self.dark = Field::retained(report.dark, fields.dark);
        self.theta = Field::retained(report.theta, fields.theta);
        self.window = Some(window);
        self.normalize();
        self.status = IngestStatus::Ready;
    }

    /// A serializable overview of the dataset.
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let describe = |kind: FieldKind, shape: Option<&[usize]>, precision: Option<Precision>| {
            let state = self.state(kind);
            FieldSummary {
                kind,
                shape: shape.map(<[usize]>::to_vec),
                precision,
                status: state.status.clone(),
                origin: state.origin,
            }
        };
        DatasetSummary {
            status: self.status,
            flags: self.validity(),
            source: self.provenance.source().map(Path::to_path_buf),
            created: format!("{} {}", self.provenance.date(), self.provenance.time()),
            window: self.window,
            fields: vec![
                describe(
                    FieldKind::Data,
                    self.data().map(NumericArray::shape),
                    self.data().map(NumericArray::precision),
                ),
                describe(
                    FieldKind::White,
                    self.white().map(NumericArray::shape),
                    self.white().map(NumericArray::precision),
                ),
                describe(
                    FieldKind::Dark,
                    self.dark().map(NumericArray::shape),
                    self.dark().map(NumericArray::precision),
                ),
                describe(
                    FieldKind::Theta,
                    self.theta().map(NumericArray::shape),
                    self.theta().map(NumericArray::precision),
                ),
            ],
        }
    }
}

/// Builder for datasets assembled from in-memory arrays.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    data: Option<NumericArray<Ix3>>,
    white: Option<NumericArray<Ix3>>,
    dark: Option<NumericArray<Ix3>>,
    theta: Option<NumericArray<Ix1>>,
    log_level: Option<String>,
}

impl DatasetBuilder {
    #[must_use]
    pub fn data(mut self, data: impl Into<NumericArray<Ix3>>) -> Self {
        self.data = Some(data.into());
        self
    }

    #[must_use]
    pub fn white(mut self, white: impl Into<NumericArray<Ix3>>) -> Self {
        self.white = Some(white.into());
        self
    }

    #[must_use]
    pub fn dark(mut self, dark: impl Into<NumericArray<Ix3>>) -> Self {
        self.dark = Some(dark.into());
        self
    }

    #[must_use]
    pub fn theta(mut self, theta: impl Into<NumericArray<Ix1>>) -> Self {
        self.theta = Some(theta.into());
        self
    }

    /// Minimum severity of forwarded diagnostics.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Builds the dataset. A field's flag is set iff its array was supplied.
    #[must_use]
    pub fn build(self) -> Dataset {
        let supplied = self.data.is_some()
            || self.white.is_some()
            || self.dark.is_some()
            || self.theta.is_some();
        let mut log = DiagnosticLog::default();
        if let Some(level) = self.log_level.as_deref() {
            log.set_level(level);
        }
        log.emit(Diagnostic::ok(Severity::Debug, "dataset initialization"));
        Dataset {
            data: Field::supplied(self.data),
            white: Field::supplied(self.white),
            dark: Field::supplied(self.dark),
            theta: Field::supplied(self.theta),
            status: if supplied {
                IngestStatus::InMemory
            } else {
                IngestStatus::Empty
            },
            recon_done: false,
            provenance: Provenance::now(),
            params: SliceParams::default(),
            window: None,
            log,
        }
    }
}

/// Per-field part of a [`DatasetSummary`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldSummary {
    pub kind: FieldKind,
    pub shape: Option<Vec<usize>>,
    pub precision: Option<Precision>,
    pub status: FieldStatus,
    pub origin: Option<Origin>,
}

/// Overview of a dataset for reports.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatasetSummary {
    pub status: IngestStatus,
    pub flags: ValidityFlags,
    pub source: Option<PathBuf>,
    pub created: String,
    pub window: Option<ResolvedWindow>,
    pub fields: Vec<FieldSummary>,
}
