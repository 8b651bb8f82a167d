//! Per-field validity tracking.
//!
//! Every field of a [`crate::Dataset`] carries a [`FieldState`]: the verdict
//! of validation ([`FieldStatus`]) and, once an array is retained, where it
//! came from ([`Origin`]). The classic six-flag view ([`ValidityFlags`]) is
//! derived from these states and never stored on its own.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fields of a Data Exchange dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldKind {
    Data,
    White,
    Dark,
    Theta,
}

impl FieldKind {
    /// All fields, in ingestion order.
    pub const ALL: [FieldKind; 4] = [Self::Data, Self::White, Self::Dark, Self::Theta];

    /// Node name inside the `exchange` group.
    #[must_use]
    pub fn node_name(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::White => "data_white",
            Self::Dark => "data_dark",
            Self::Theta => "theta",
        }
    }

    /// Full path of the node inside the container.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Data => "exchange/data",
            Self::White => "exchange/data_white",
            Self::Dark => "exchange/data_dark",
            Self::Theta => "exchange/theta",
        }
    }

    /// True for the optional fields that can be synthesized.
    #[must_use]
    pub fn is_auxiliary(self) -> bool {
        !matches!(self, Self::Data)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.node_name())
    }
}

/// Reason a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Defect {
    /// The path does not resolve to a regular file.
    NotAFile,
    /// The file cannot be opened for both reading and writing.
    PermissionDenied,
    /// The file extension is not a recognized container extension.
    UnsupportedExtension(String),
    /// The `exchange` group is absent.
    MissingExchangeGroup,
    /// The node has the wrong number of axes.
    Dimensionality { expected: Vec<usize>, found: usize },
    /// The node's shape disagrees with the projection data.
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },
}

impl std::fmt::Display for Defect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAFile => f.write_str("not a regular file"),
            Self::PermissionDenied => f.write_str("read/write permission denied"),
            Self::UnsupportedExtension(ext) => write!(f, "unsupported extension '{ext}'"),
            Self::MissingExchangeGroup => f.write_str("missing /exchange group"),
            Self::Dimensionality { expected, found } => {
                write!(f, "expected {expected:?} axes, found {found}")
            }
            Self::ShapeMismatch { expected, found } => {
                write!(f, "expected shape {expected:?}, found {found:?}")
            }
        }
    }
}

/// Verdict of validation for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldStatus {
    /// Never provided.
    #[default]
    Missing,
    /// Provided but unusable.
    Invalid(Defect),
    /// Passed every applicable check.
    Valid,
}

impl FieldStatus {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Downgrades a valid status; an existing failure is kept.
    pub fn reject(&mut self, defect: Defect) {
        if self.is_valid() {
            *self = Self::Invalid(defect);
        }
    }
}

/// Where a retained array came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Origin {
    /// Read from the container.
    File,
    /// Supplied by the caller at construction.
    Memory,
    /// Generated as a fallback for a missing or invalid field.
    Synthetic,
}

/// Validation verdict plus the origin of the retained array, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldState {
    pub status: FieldStatus,
    pub origin: Option<Origin>,
}

impl FieldState {
    /// A field supplied in memory.
    #[must_use]
    pub fn supplied() -> Self {
        Self {
            status: FieldStatus::Valid,
            origin: Some(Origin::Memory),
        }
    }

    /// True if the field currently holds a usable array.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.origin.is_some()
    }

    /// True if the array is a generated fallback.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.origin == Some(Origin::Synthetic)
    }
}

/// Aggregate state of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IngestStatus {
    /// Constructed without arrays and never read.
    #[default]
    Empty,
    /// Holds caller-supplied arrays; never validated against a file.
    InMemory,
    /// The last read rejected the file; no field is trustworthy.
    Rejected,
    /// The last read succeeded and every field is normalized.
    Ready,
}

/// Boolean view of a dataset's validity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct ValidityFlags {
    pub data: bool,
    pub white: bool,
    pub dark: bool,
    pub theta: bool,
    pub file_check: bool,
    pub recon_done: bool,
}

/// On-disk shapes of the nodes found during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldShapes {
    pub data: Option<Vec<usize>>,
    pub white: Option<Vec<usize>>,
    pub dark: Option<Vec<usize>>,
    pub theta: Option<Vec<usize>>,
}

impl FieldShapes {
    #[must_use]
    pub fn get(&self, kind: FieldKind) -> Option<&[usize]> {
        match kind {
            FieldKind::Data => self.data.as_deref(),
            FieldKind::White => self.white.as_deref(),
            FieldKind::Dark => self.dark.as_deref(),
            FieldKind::Theta => self.theta.as_deref(),
        }
    }

    pub fn set(&mut self, kind: FieldKind, shape: Vec<usize>) {
        let slot = match kind {
            FieldKind::Data => &mut self.data,
            FieldKind::White => &mut self.white,
            FieldKind::Dark => &mut self.dark,
            FieldKind::Theta => &mut self.theta,
        };
        *slot = Some(shape);
    }
}

/// Outcome of validating a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValidationReport {
    pub data: FieldStatus,
    pub white: FieldStatus,
    pub dark: FieldStatus,
    pub theta: FieldStatus,
    pub shapes: FieldShapes,
}

impl ValidationReport {
    /// Status of one field.
    #[must_use]
    pub fn status(&self, kind: FieldKind) -> &FieldStatus {
        match kind {
            FieldKind::Data => &self.data,
            FieldKind::White => &self.white,
            FieldKind::Dark => &self.dark,
            FieldKind::Theta => &self.theta,
        }
    }

    /// Mutable status of one field.
    pub fn status_mut(&mut self, kind: FieldKind) -> &mut FieldStatus {
        match kind {
            FieldKind::Data => &mut self.data,
            FieldKind::White => &mut self.white,
            FieldKind::Dark => &mut self.dark,
            FieldKind::Theta => &mut self.theta,
        }
    }

    /// True iff the projection data survived every check.
    #[must_use]
    pub fn file_check(&self) -> bool {
        self.data.is_valid()
    }

    /// Shape of a field, only if the field is valid.
    #[must_use]
    pub fn valid_shape(&self, kind: FieldKind) -> Option<&[usize]> {
        if self.status(kind).is_valid() {
            self.shapes.get(kind)
        } else {
            None
        }
    }

    /// Shape of the projection data, if valid and 3-D.
    #[must_use]
    pub fn data_shape(&self) -> Option<[usize; 3]> {
        match self.valid_shape(FieldKind::Data)? {
            &[p, r, c] => Some([p, r, c]),
            _ => None,
        }
    }
}
