//! Drivers run on datasets produced by the ingestion pipeline.

use ndarray::{Array1, Array3};
use std::fs::File;
use tempfile::tempdir;
use tomors_algorithms::{
    apply_frames, AdaptiveSegmentParams, AdaptiveThreshold, BackProjector, CenterSweep, Error,
};
use tomors_core::Dataset;
use tomors_io::{MemoryContainer, MemoryOpener, ReadOptions, Reader};

fn ingest(container: MemoryContainer) -> (tempfile::TempDir, Dataset) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.h5");
    File::create(&path).unwrap();
    let mut dataset = Dataset::new();
    Reader::new(MemoryOpener::new(container))
        .read(&mut dataset, &path, &ReadOptions::new())
        .unwrap();
    (dir, dataset)
}

#[test]
fn center_sweep_writes_one_image_per_candidate() {
    let projections = 24;
    let data = Array3::from_shape_fn((projections, 3, 16), |(_, _, c)| {
        if c == 8 {
            1000u16
        } else {
            0
        }
    });
    let theta = Array1::linspace(0.0f64, 180.0, projections + 1)
        .slice(ndarray::s![..projections])
        .to_owned();
    let (dir, dataset) = ingest(
        MemoryContainer::new()
            .with_dataset("exchange/data", data)
            .with_dataset("exchange/theta", theta),
    );

    let out = dir.path().join("diagnose");
    let sweep = CenterSweep::new().with_centers(Some(6.0), Some(10.0), Some(1.0));
    let written = sweep.run(&dataset, &BackProjector, &out).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["6.tif", "7.tif", "8.tif", "9.tif"]);
    assert!(written.iter().all(|p| p.is_file()));
    let image = image::open(&written[2]).unwrap().into_luma16();
    assert_eq!(image.dimensions(), (16, 16));
}

#[test]
fn sweep_rejects_slice_out_of_range() {
    let (dir, dataset) = ingest(
        MemoryContainer::new().with_dataset("exchange/data", Array3::<u16>::ones((4, 2, 8))),
    );
    let err = CenterSweep::new()
        .with_slice(2)
        .run(&dataset, &BackProjector, dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn sweep_requires_ready_dataset() {
    let dir = tempdir().unwrap();
    let dataset = Dataset::builder()
        .data(Array3::<f32>::zeros((2, 2, 2)))
        .build();
    let err = CenterSweep::new()
        .run(&dataset, &BackProjector, dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::NotReady(_)));
}

#[test]
fn segmentation_binarizes_every_frame() {
    let data = Array3::from_shape_fn((5, 6, 6), |(p, r, c)| {
        if r == 3 && c == p {
            900u16
        } else {
            100
        }
    });
    let (_dir, mut dataset) = ingest(MemoryContainer::new().with_dataset("exchange/data", data));

    let transform = AdaptiveThreshold::new(AdaptiveSegmentParams {
        block_size: 3,
        offset: 0.0,
    })
    .unwrap();
    apply_frames(&mut dataset, &transform).unwrap();

    let segmented = dataset.data_f32().unwrap();
    assert!(segmented.iter().all(|&v| v == 0.0 || v == 1.0));
    for p in 0..5 {
        assert_eq!(segmented[[p, 3, p]], 1.0);
        assert_eq!(segmented.index_axis(ndarray::Axis(0), p).sum(), 1.0);
    }
}
