//! Integration tests for the pipeline module.
//!
//! These tests verify end-to-end behavior against a real on-disk store:
//! - Near-duplicates are flagged, distinct images are not
//! - Re-running over unchanged files writes nothing new
//! - Corrupt, missing and unsupported inputs never stop a batch

use dupehunter::core::pipeline::Pipeline;
use dupehunter::core::record::FingerprintRecord;
use dupehunter::core::store::{open_store, FingerprintStore, SqliteStore};
use dupehunter::core::TaskOutcome;
use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Horizontal gradient; `offset` brightens without changing the gradient direction
fn write_gradient(dir: &Path, name: &str, rising: bool, offset: u32) -> PathBuf {
    let path = dir.join(name);
    let format = ImageFormat::from_path(&path).unwrap();
    RgbImage::from_fn(64, 48, |x, _| {
        let v = (if rising { x * 3 } else { 189 - x * 3 } + offset) as u8;
        image::Rgb([v, v, v])
    })
    .save_with_format(&path, format)
    .unwrap();
    path
}

fn create_pipeline(store: Arc<SqliteStore>) -> Pipeline {
    Pipeline::builder()
        .store(store)
        .workers(4)
        .threshold(12)
        .build()
        .unwrap()
}

#[test]
fn near_duplicates_are_flagged() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let original = write_gradient(images.path(), "original.png", true, 0);
    let brighter = write_gradient(images.path(), "brighter.jpg", true, 20);
    let mirrored = write_gradient(images.path(), "mirrored.png", false, 0);

    let store = Arc::new(open_store(db.path()).unwrap());
    let pipeline = create_pipeline(Arc::clone(&store));

    let result = pipeline
        .run(&[original.clone(), brighter.clone(), mirrored.clone()])
        .unwrap();

    assert_eq!(result.ingest.processed, 3);
    assert_eq!(result.ingest.ingested.len(), 3);
    assert_eq!(result.report.total_records, 3);
    assert!(result.report.is_flagged(&original));
    assert!(result.report.is_flagged(&brighter));
    assert!(!result.report.is_flagged(&mirrored));
}

#[test]
fn records_are_persisted_as_json() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let path = write_gradient(images.path(), "a.png", true, 0);

    let store = Arc::new(open_store(db.path()).unwrap());
    create_pipeline(Arc::clone(&store)).run(&[path.clone()]).unwrap();

    let bytes = store.get(&path.to_string_lossy()).unwrap().unwrap();
    let record = FingerprintRecord::from_slice(&bytes).unwrap();
    assert_eq!(record.path, path);
    assert_eq!(record.name, "a.png");
    assert_eq!(record.fingerprint.len(), 8);
    assert_eq!(record.size, std::fs::metadata(&path).unwrap().len());
}

#[test]
fn second_run_reuses_stored_fingerprints() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let paths = vec![
        write_gradient(images.path(), "a.png", true, 0),
        write_gradient(images.path(), "b.png", true, 10),
    ];

    {
        let store = Arc::new(open_store(db.path()).unwrap());
        let first = create_pipeline(Arc::clone(&store)).run(&paths).unwrap();
        assert_eq!(first.ingest.ingested.len(), 2);
        store.close().unwrap();
    }

    let store = Arc::new(open_store(db.path()).unwrap());
    let second = create_pipeline(Arc::clone(&store)).run(&paths).unwrap();

    assert_eq!(second.ingest.processed, 2);
    assert_eq!(second.ingest.skipped, 2);
    assert!(second.ingest.ingested.is_empty());
    assert_eq!(second.report.total_records, 2);
    assert_eq!(second.report.flagged.len(), 2);
}

#[test]
fn detection_covers_records_from_earlier_runs() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let first = write_gradient(images.path(), "first.png", true, 0);
    let later = write_gradient(images.path(), "later.png", true, 5);

    let store = Arc::new(open_store(db.path()).unwrap());
    let pipeline = create_pipeline(Arc::clone(&store));
    pipeline.run(&[first.clone()]).unwrap();

    let result = pipeline.run(&[later.clone()]).unwrap();

    assert_eq!(result.ingest.processed, 1);
    assert_eq!(result.report.total_records, 2);
    assert!(result.report.is_flagged(&first));
    assert!(result.report.is_flagged(&later));
}

#[test]
fn bad_inputs_do_not_stop_the_batch() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let good = write_gradient(images.path(), "good.png", true, 0);
    let corrupt = images.path().join("corrupt.jpg");
    std::fs::write(&corrupt, b"this is not a valid image file").unwrap();
    let bitmap = write_gradient(images.path(), "other.bmp", true, 0);
    let missing = images.path().join("missing.png");

    let store = Arc::new(open_store(db.path()).unwrap());
    let result = create_pipeline(Arc::clone(&store))
        .run(&[good, corrupt, bitmap.clone(), missing])
        .unwrap();

    assert_eq!(result.ingest.processed, 4);
    assert_eq!(result.ingest.ingested.len(), 1);
    assert_eq!(result.ingest.skipped, 1);
    assert_eq!(result.ingest.failed, 2);
    assert_eq!(result.report.total_records, 1);

    let bitmap_report = result
        .ingest
        .reports
        .iter()
        .find(|r| r.path == bitmap)
        .unwrap();
    assert!(matches!(bitmap_report.outcome, TaskOutcome::Skipped { .. }));
}

#[test]
fn empty_input_reports_on_existing_store() {
    let db = TempDir::new().unwrap();
    let store = Arc::new(open_store(db.path()).unwrap());

    let result = create_pipeline(store).run(&[]).unwrap();

    assert_eq!(result.ingest.processed, 0);
    assert_eq!(result.report.total_records, 0);
    assert!(result.report.flagged.is_empty());
}
