//! tomors-core: Dataset model for Data Exchange tomography ingestion.
//!
//! This crate provides the in-memory dataset, per-field validity tracking,
//! slicing windows, fallback synthesis for auxiliary fields and the
//! normalization of every retained array to `f32`.
//!

pub mod array;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod synth;
pub mod validity;
pub mod window;

pub use array::{NumericArray, Precision};
pub use dataset::{
    Dataset, DatasetBuilder, DatasetSummary, FieldSummary, Materialized, MaterializedFields,
    Provenance,
};
pub use diagnostics::{Diagnostic, DiagnosticLog, Outcome, Severity};
pub use error::{Error, Result};
pub use validity::{
    Defect, FieldKind, FieldShapes, FieldState, FieldStatus, IngestStatus, Origin,
    ValidationReport, ValidityFlags,
};
pub use window::{AxisRange, ResolvedWindow, ShotRange, SliceParams, Window};
