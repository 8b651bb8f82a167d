//! End-to-end ingestion against in-memory containers.

use approx::assert_relative_eq;
use ndarray::{arr0, s, Array1, Array3};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};
use tomors_core::{
    Dataset, Defect, FieldKind, FieldStatus, IngestStatus, Origin, Precision, SliceParams, Window,
};
use tomors_io::{MemoryContainer, MemoryOpener, ReadOptions, Reader};

fn scan_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("scan.h5");
    File::create(&path).unwrap();
    path
}

fn ramp(shape: (usize, usize, usize)) -> Array3<u16> {
    Array3::from_shape_fn(shape, |(p, r, c)| {
        u16::try_from((p * 7 + r * 3 + c) % 1000).unwrap()
    })
}

fn read(container: MemoryContainer, path: &Path, options: &ReadOptions) -> Dataset {
    let reader = Reader::new(MemoryOpener::new(container));
    let mut dataset = Dataset::new();
    reader.read(&mut dataset, path, options).unwrap();
    dataset
}

#[test]
fn missing_exchange_group_populates_nothing() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new()
        .with_dataset("data", ramp((4, 2, 2)))
        .with_dataset("theta", Array1::<f64>::zeros(4));

    let dataset = read(container, &path, &ReadOptions::new());

    assert_eq!(dataset.status(), IngestStatus::Rejected);
    let flags = dataset.validity();
    assert!(!flags.data);
    assert!(!flags.file_check);
    assert!(dataset.data().is_none());
    assert!(dataset.white().is_none());
    assert!(dataset.dark().is_none());
    assert!(dataset.theta().is_none());
    assert_eq!(
        dataset.state(FieldKind::Data).status,
        FieldStatus::Invalid(Defect::MissingExchangeGroup)
    );
}

#[test]
fn rejected_read_discards_previous_fields() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let mut dataset = Dataset::builder().data(ramp((2, 2, 2))).build();
    let reader = Reader::new(MemoryOpener::new(MemoryContainer::new()));

    reader.read(&mut dataset, &path, &ReadOptions::new()).unwrap();

    assert_eq!(dataset.status(), IngestStatus::Rejected);
    assert!(dataset.data().is_none());
}

#[test]
fn absent_white_is_mean_of_data_window() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let data = ramp((6, 5, 8));
    let container = MemoryContainer::new()
        .with_dataset("exchange/data", data.clone())
        .with_dataset("exchange/data_dark", Array3::<u16>::zeros((2, 5, 8)));
    let window = SliceParams::default()
        .with_projections(Some(1), Some(5), None)
        .with_slices(Some(1), Some(4), None)
        .with_pixels(None, None, Some(2));

    let dataset = read(container, &path, &ReadOptions::new().with_window(window));

    let expected = data
        .slice(s![1..5, 1..4, ..;2])
        .mapv(f64::from)
        .mean()
        .unwrap();
    let white = dataset.white_f32().unwrap();
    assert_eq!(white.dim(), (1, 3, 4));
    for &value in white {
        assert_relative_eq!(f64::from(value), expected, epsilon = 1e-3);
    }
    assert_eq!(dataset.state(FieldKind::White).status, FieldStatus::Missing);
    assert!(dataset.state(FieldKind::White).is_synthetic());
    assert_eq!(dataset.state(FieldKind::Dark).origin, Some(Origin::File));
    assert_eq!(dataset.dark_f32().unwrap().dim(), (2, 3, 4));
}

#[test]
fn absent_theta_spans_half_turn() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new().with_dataset("exchange/data", ramp((12, 2, 3)));
    let window = SliceParams::default().with_projections(Some(2), None, Some(3));

    let dataset = read(container, &path, &ReadOptions::new().with_window(window));

    let n = dataset.data_f32().unwrap().dim().0;
    assert_eq!(n, 4);
    let theta = dataset.theta_f32().unwrap();
    assert_eq!(theta.len(), n);
    assert_relative_eq!(theta[0], 0.0);
    assert!(theta.iter().zip(theta.iter().skip(1)).all(|(a, b)| a <= b));
    let upper = 180.0 * 4.0 / 5.0;
    assert!(theta.iter().all(|&angle| (0.0..upper).contains(&angle)));
    assert!(dataset.state(FieldKind::Theta).is_synthetic());
}

#[test]
fn repeated_reads_are_identical() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new()
        .with_dataset("exchange/data", ramp((5, 3, 4)))
        .with_dataset("exchange/data_white", ramp((2, 3, 4)))
        .with_dataset("exchange/theta", Array1::linspace(0.0f64, 180.0, 5));
    let reader = Reader::new(MemoryOpener::new(container));
    let options = ReadOptions::new().with_window(SliceParams::default().with_pixels(
        Some(1),
        None,
        Some(2),
    ));

    let mut dataset = Dataset::new();
    reader.read(&mut dataset, &path, &options).unwrap();
    let first = (
        dataset.data_f32().cloned(),
        dataset.white_f32().cloned(),
        dataset.dark_f32().cloned(),
        dataset.theta_f32().cloned(),
        dataset.validity(),
        dataset.summary().fields,
    );
    reader.read(&mut dataset, &path, &options).unwrap();
    let second = (
        dataset.data_f32().cloned(),
        dataset.white_f32().cloned(),
        dataset.dark_f32().cloned(),
        dataset.theta_f32().cloned(),
        dataset.validity(),
        dataset.summary().fields,
    );

    assert_eq!(first, second);
    assert_eq!(reader.opener().open_count(), 2);
}

#[test]
fn omitted_window_covers_full_extent() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new()
        .with_dataset("exchange/data", ramp((7, 3, 5)))
        .with_dataset("exchange/data_white", ramp((2, 3, 5)))
        .with_dataset("exchange/data_dark", ramp((3, 3, 5)));

    let dataset = read(container, &path, &ReadOptions::new());

    let window = dataset.window().unwrap();
    assert_eq!(window.projections, Window::full(7));
    assert_eq!(window.slices, Window::full(3));
    assert_eq!(window.pixels, Window::full(5));
    assert_eq!(window.white, Some(Window::full(2)));
    assert_eq!(window.dark, Some(Window::full(3)));
    assert_eq!(dataset.data_f32().unwrap().dim(), (7, 3, 5));
}

#[test]
fn every_retained_array_is_single_precision() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new()
        .with_dataset("exchange/data", Array3::<i16>::ones((3, 2, 2)))
        .with_dataset("exchange/data_white", Array3::<u8>::ones((1, 2, 2)))
        .with_dataset("exchange/data_dark", Array3::<f64>::zeros((1, 2, 2)))
        .with_dataset("exchange/theta", Array1::<i32>::from(vec![0, 60, 120]));

    let dataset = read(container, &path, &ReadOptions::new());

    assert!(dataset.is_ready());
    for field in dataset.summary().fields {
        assert_eq!(field.precision, Some(Precision::F32), "{:?}", field.kind);
    }
    assert_eq!(
        dataset.theta_f32().unwrap(),
        &Array1::from(vec![0.0f32, 60.0, 120.0])
    );
}

#[test]
fn projections_without_auxiliaries_are_completed() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new()
        .with_dataset("exchange/data", Array3::<u16>::from_elem((180, 4, 256), 500));

    let dataset = read(container, &path, &ReadOptions::new());

    let flags = dataset.validity();
    assert!(flags.data && flags.white && flags.dark && flags.theta && flags.file_check);
    assert!(!flags.recon_done);
    for kind in [FieldKind::White, FieldKind::Dark, FieldKind::Theta] {
        assert!(dataset.state(kind).is_synthetic(), "{kind}");
    }
    let theta = dataset.theta_f32().unwrap();
    assert_eq!(theta.len(), 180);
    assert_relative_eq!(theta[0], 0.0);
    assert_relative_eq!(theta[179], 178.0, epsilon = 0.05);
    assert_eq!(dataset.white_f32().unwrap().dim(), (1, 4, 256));
    assert_eq!(dataset.dark_f32().unwrap().dim(), (1, 4, 256));
    assert_relative_eq!(dataset.white_f32().unwrap()[[0, 2, 100]], 500.0);
}

#[test]
fn reference_with_wrong_trailing_shape_is_synthesized() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let data = ramp((4, 3, 6));
    let container = MemoryContainer::new()
        .with_dataset("exchange/data", data.clone())
        .with_dataset("exchange/data_white", Array3::<u16>::ones((2, 3, 5)));

    let dataset = read(container, &path, &ReadOptions::new());

    assert_eq!(
        dataset.state(FieldKind::White).status,
        FieldStatus::Invalid(Defect::ShapeMismatch {
            expected: vec![3, 6],
            found: vec![3, 5]
        })
    );
    assert!(dataset.state(FieldKind::White).is_synthetic());
    assert!(dataset.window().unwrap().white.is_none());
    let expected = data.mapv(f64::from).mean().unwrap();
    let white = dataset.white_f32().unwrap();
    assert_eq!(white.dim(), (1, 3, 6));
    assert_relative_eq!(f64::from(white[[0, 1, 1]]), expected, epsilon = 1e-3);
}

#[test]
fn scalar_theta_reads_as_one_angle() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new()
        .with_dataset("exchange/data", ramp((1, 2, 2)))
        .with_dataset("exchange/theta", arr0(42.0f64));

    let dataset = read(container, &path, &ReadOptions::new());

    assert_eq!(dataset.state(FieldKind::Theta).origin, Some(Origin::File));
    assert_eq!(dataset.theta_f32().unwrap(), &Array1::from(vec![42.0f32]));
}

#[test]
fn failed_read_leaves_dataset_not_ready() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let reader = Reader::new(MemoryOpener::new(
        MemoryContainer::new().with_dataset("exchange/data", ramp((4, 2, 2))),
    ));
    let mut dataset = Dataset::new();
    reader.read(&mut dataset, &path, &ReadOptions::new()).unwrap();
    assert!(dataset.is_ready());

    let zero_step = ReadOptions::new()
        .with_window(SliceParams::default().with_projections(None, None, Some(0)));
    let err = reader.read(&mut dataset, &path, &zero_step).unwrap_err();

    assert!(matches!(err, tomors_io::Error::CoreError(_)));
    assert_eq!(dataset.status(), IngestStatus::Rejected);
    assert!(!dataset.is_ready());
    let flags = dataset.validity();
    assert!(!flags.data);
    assert!(!flags.file_check);
    assert!(dataset.data().is_none());
    assert!(dataset.white().is_none());
    assert!(dataset.dark().is_none());
    assert!(dataset.theta().is_none());
    assert!(dataset.window().is_none());
    assert!(dataset
        .diagnostics()
        .last()
        .unwrap()
        .message
        .starts_with("read aborted"));
}

#[test]
fn exchange_without_data_is_rejected() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new()
        .with_group("exchange")
        .with_dataset("exchange/theta", Array1::<f64>::zeros(4));
    let mut dataset = Dataset::builder().data(ramp((4, 2, 2))).build();
    let reader = Reader::new(MemoryOpener::new(container));

    reader.read(&mut dataset, &path, &ReadOptions::new()).unwrap();

    assert_eq!(dataset.status(), IngestStatus::Rejected);
    assert!(!dataset.state(FieldKind::Data).status.is_valid());
    assert!(!dataset.validity().file_check);
    assert!(dataset.data().is_none());
    assert!(dataset.theta().is_none());
    assert!(dataset.diagnostics().iter().any(|d| {
        d.severity == tomors_core::Severity::Error && d.to_string() == "/exchange/data [failed]"
    }));
    assert_eq!(reader.opener().open_count(), 1);
}

#[test]
fn missing_file_is_never_opened() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.h5");
    let reader = Reader::new(MemoryOpener::new(
        MemoryContainer::new().with_dataset("exchange/data", ramp((1, 1, 1))),
    ));
    let mut dataset = Dataset::new();

    reader.read(&mut dataset, &path, &ReadOptions::new()).unwrap();

    assert_eq!(
        dataset.state(FieldKind::Data).status,
        FieldStatus::Invalid(Defect::NotAFile)
    );
    assert_eq!(reader.opener().open_count(), 0);
}

#[cfg(unix)]
#[test]
fn unreadable_file_is_never_opened() {
    use std::fs::{OpenOptions, Permissions};
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    std::fs::set_permissions(&path, Permissions::from_mode(0o000)).unwrap();
    if OpenOptions::new().read(true).open(&path).is_ok() {
        // Running with elevated privileges; permissions are not enforced.
        return;
    }
    let reader = Reader::new(MemoryOpener::new(
        MemoryContainer::new().with_dataset("exchange/data", ramp((1, 1, 1))),
    ));
    let mut dataset = Dataset::new();

    reader.read(&mut dataset, &path, &ReadOptions::new()).unwrap();

    let flags = dataset.validity();
    assert!(!flags.data);
    assert!(!flags.file_check);
    assert_eq!(
        dataset.state(FieldKind::Data).status,
        FieldStatus::Invalid(Defect::PermissionDenied)
    );
    assert_eq!(reader.opener().open_count(), 0);
}

#[test]
fn log_file_sits_beside_input() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new().with_dataset("exchange/data", ramp((2, 2, 2)));
    let reader = Reader::new(MemoryOpener::new(container));
    let options = ReadOptions::new().with_log_level("warning");

    let mut dataset = Dataset::new();
    reader.read(&mut dataset, &path, &options).unwrap();
    let log_path = dir.path().join("scan.log");
    let first = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = first.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines.iter().all(|line| line.contains(" - tomors - WARNING - ")));
    assert!(first.contains("auto-normalization: data_white set to mean of data [ok]"));
    assert!(first.contains("/exchange/theta node [failed]"));

    reader.read(&mut dataset, &path, &options).unwrap();
    let second = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(second.lines().count(), 2 * lines.len());
}

#[test]
fn diagnostics_distinguish_read_from_synthesized() {
    let dir = tempdir().unwrap();
    let path = scan_file(&dir);
    let container = MemoryContainer::new()
        .with_dataset("exchange/data", ramp((3, 2, 2)))
        .with_dataset("exchange/theta", Array1::<f32>::zeros(3));

    let dataset = read(container, &path, &ReadOptions::new().with_log_level("debug"));

    let messages: Vec<String> = dataset
        .diagnostics()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert!(messages.contains(&"read data from file [ok]".to_string()));
    assert!(messages.contains(&"read theta from file [ok]".to_string()));
    assert!(messages
        .contains(&"auto-normalization: data_dark set to mean of data [ok]".to_string()));
    assert!(messages.contains(&"type normalization to f32 [ok]".to_string()));
    assert_eq!(
        dataset.provenance().source(),
        Some(std::path::absolute(&path).unwrap().as_path())
    );
}
