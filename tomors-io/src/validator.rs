//! File and layout validation of Data Exchange files.
//!
//! Checks run in a fixed order and never stop early: every check emits one
//! diagnostic so the log shows the complete picture. Failures on the
//! projection data are errors and are terminal for that field; failures on
//! the white, dark and theta nodes are warnings that only invalidate the
//! field concerned.

use crate::container::{Container, ContainerOpener};
use crate::Result;
use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::path::Path;
use tomors_core::{
    Defect, Diagnostic, DiagnosticLog, FieldKind, FieldStatus, Severity, ValidationReport,
};

/// Recognized container file extensions.
pub const EXTENSIONS: [&str; 2] = ["h5", "hdf"];

/// Group holding every Data Exchange node.
pub const EXCHANGE_GROUP: &str = "exchange";

/// Filesystem checks: existence, read/write access and extension.
///
/// Returns the resulting status of the projection data.
pub fn check_file(path: &Path, log: &mut DiagnosticLog) -> FieldStatus {
    let mut status = FieldStatus::Valid;

    let exists = path.is_file();
    log.emit(Diagnostic::check(
        exists,
        Severity::Info,
        Severity::Error,
        format!("file check: {}", path.display()),
    ));
    if !exists {
        status.reject(Defect::NotAFile);
    }

    let accessible = OpenOptions::new().read(true).write(true).open(path).is_ok();
    log.emit(Diagnostic::check(
        accessible,
        Severity::Debug,
        Severity::Error,
        "file permissions",
    ));
    if !accessible {
        status.reject(Defect::PermissionDenied);
    }

    let extension = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    let known = EXTENSIONS.contains(&extension);
    log.emit(Diagnostic::check(
        known,
        Severity::Debug,
        Severity::Error,
        format!("file extension: .{extension}"),
    ));
    if !known {
        status.reject(Defect::UnsupportedExtension(extension.to_string()));
    }

    status
}

/// Report for a file that failed the filesystem checks.
///
/// The container is never opened, so the auxiliary nodes stay `Missing`.
pub fn file_rejected(data: FieldStatus, log: &mut DiagnosticLog) -> ValidationReport {
    log.emit(Diagnostic::failed(Severity::Error, "file check"));
    ValidationReport {
        data,
        ..ValidationReport::default()
    }
}

/// Layout checks on an open container.
///
/// # Errors
/// Returns an error only if the container cannot report the shape of a node
/// it claims to hold.
pub fn check_layout<C: Container>(
    container: &C,
    log: &mut DiagnosticLog,
) -> Result<ValidationReport> {
    let mut report = ValidationReport {
        data: FieldStatus::Valid,
        ..ValidationReport::default()
    };

    let has_exchange = container.contains_group(EXCHANGE_GROUP);
    log.emit(Diagnostic::check(
        has_exchange,
        Severity::Debug,
        Severity::Error,
        format!("/{EXCHANGE_GROUP} group"),
    ));
    if !has_exchange {
        report.data.reject(Defect::MissingExchangeGroup);
    }

    for kind in FieldKind::ALL {
        check_node(container, kind, &mut report, log)?;
    }
    for kind in FieldKind::ALL {
        check_dimensions(kind, &mut report, log);
    }
    check_compatibility(&mut report, log);

    log.emit(Diagnostic::check(
        report.file_check(),
        Severity::Debug,
        Severity::Error,
        "file check",
    ));
    Ok(report)
}

/// Opens `path` only if the filesystem checks pass, and validates it.
///
/// # Errors
/// Returns an error if the container cannot be opened or queried.
pub fn validate<O: ContainerOpener>(
    opener: &O,
    path: &Path,
    log: &mut DiagnosticLog,
) -> Result<ValidationReport> {
    let status = check_file(path, log);
    if !status.is_valid() {
        return Ok(file_rejected(status, log));
    }
    let container = opener.open(path)?;
    check_layout(&container, log)
}

fn severity_of(kind: FieldKind) -> Severity {
    if kind.is_auxiliary() {
        Severity::Warning
    } else {
        Severity::Error
    }
}

fn check_node<C: Container>(
    container: &C,
    kind: FieldKind,
    report: &mut ValidationReport,
    log: &mut DiagnosticLog,
) -> Result<()> {
    let present = container.contains_dataset(kind.path());
    let label = if kind.is_auxiliary() && !present {
        format!("/{} node", kind.path())
    } else {
        format!("/{}", kind.path())
    };
    log.emit(Diagnostic::check(
        present,
        Severity::Debug,
        severity_of(kind),
        label,
    ));

    if present {
        report.shapes.set(kind, container.shape(kind.path())?);
        if kind.is_auxiliary() {
            *report.status_mut(kind) = FieldStatus::Valid;
        }
    } else {
        let status = report.status_mut(kind);
        if status.is_valid() {
            *status = FieldStatus::Missing;
        }
    }
    Ok(())
}

fn check_dimensions(kind: FieldKind, report: &mut ValidationReport, log: &mut DiagnosticLog) {
    let Some(ndim) = report.shapes.get(kind).map(<[usize]>::len) else {
        return;
    };
    if kind.is_auxiliary() && !report.status(kind).is_valid() {
        return;
    }
    let expected: &[usize] = match kind {
        FieldKind::Theta => &[0, 1],
        _ => &[3],
    };
    let passed = expected.contains(&ndim);
    log.emit(Diagnostic::check(
        passed,
        Severity::Debug,
        severity_of(kind),
        format!("{kind} dimensions"),
    ));
    if !passed {
        report.status_mut(kind).reject(Defect::Dimensionality {
            expected: expected.to_vec(),
            found: ndim,
        });
    }
}

fn check_compatibility(report: &mut ValidationReport, log: &mut DiagnosticLog) {
    let Some([projections, slices, pixels]) = report.data_shape() else {
        log.emit(Diagnostic::ok(
            Severity::Debug,
            "compatibility checks skipped, no 3-D data",
        ));
        return;
    };

    for kind in [FieldKind::White, FieldKind::Dark] {
        let Some(shape) = report.valid_shape(kind).map(<[usize]>::to_vec) else {
            continue;
        };
        let trailing = &shape[1..];
        let passed = trailing == [slices, pixels];
        log.emit(Diagnostic::check(
            passed,
            Severity::Debug,
            Severity::Warning,
            format!("{kind} compatibility"),
        ));
        if !passed {
            report.status_mut(kind).reject(Defect::ShapeMismatch {
                expected: vec![slices, pixels],
                found: trailing.to_vec(),
            });
        }
    }

    if let Some(shape) = report.valid_shape(FieldKind::Theta) {
        let count: usize = shape.iter().product();
        let passed = count == projections;
        log.emit(Diagnostic::check(
            passed,
            Severity::Debug,
            Severity::Warning,
            "theta compatibility",
        ));
        if !passed {
            report.theta.reject(Defect::ShapeMismatch {
                expected: vec![projections],
                found: vec![count],
            });
        }
    }
}
