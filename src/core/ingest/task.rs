//! Per-file ingestion: stat → check → open → decode → fingerprint → persist.

use super::TaskOutcome;
use crate::core::buffer::BufferPool;
use crate::core::hasher::decode::{decode_as, read_file, sniff};
use crate::core::hasher::{HashAlgorithm, ImageHashValue, PerceptualHash};
use crate::core::record::{FileStat, FingerprintRecord, ImageKind};
use crate::core::store::{check_existing, FingerprintStore};
use crate::error::{HashError, IngestError};
use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Stages of a single ingestion task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    Created,
    StatChecked,
    Opened,
    Decoded,
    Fingerprinted,
    Persisted,
    Done,
}

impl TaskStage {
    /// Stage at which a task ending with `error` stopped
    pub fn of_error(error: &IngestError) -> Self {
        match error {
            IngestError::Resolve { .. }
            | IngestError::NotFound { .. }
            | IngestError::IsDirectory { .. }
            | IngestError::Stat { .. } => TaskStage::Created,
            IngestError::AlreadyIngested { .. } => TaskStage::StatChecked,
            IngestError::Open { .. } => TaskStage::Opened,
            IngestError::Read { .. }
            | IngestError::Decode { .. }
            | IngestError::UnknownKind { .. } => TaskStage::Decoded,
            IngestError::Fingerprint { .. } | IngestError::Serialize { .. } => {
                TaskStage::Fingerprinted
            }
            IngestError::Persist { .. } => TaskStage::Persisted,
        }
    }
}

impl std::fmt::Display for TaskStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskStage::Created => "created",
            TaskStage::StatChecked => "stat_checked",
            TaskStage::Opened => "opened",
            TaskStage::Decoded => "decoded",
            TaskStage::Fingerprinted => "fingerprinted",
            TaskStage::Persisted => "persisted",
            TaskStage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Shared dependencies handed to every task
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub store: Arc<dyn FingerprintStore>,
    pub hasher: Arc<dyn HashAlgorithm>,
    pub buffers: BufferPool,
    pub ingested: Arc<Mutex<Vec<FingerprintRecord>>>,
}

/// Run one task to completion, logging how it ended
pub(crate) fn run(path: &Path, ctx: &TaskContext) -> TaskOutcome {
    tracing::debug!(path = %path.display(), "processing");

    match ingest_file(path, ctx) {
        Ok(record) => {
            tracing::trace!(path = %record.path.display(), stage = %TaskStage::Done, "task finished");
            TaskOutcome::Ingested
        }
        Err(e) => {
            log_early_exit(&e);
            let reason = e.to_string();
            if e.is_skip() {
                TaskOutcome::Skipped { reason }
            } else {
                TaskOutcome::Failed { reason }
            }
        }
    }
}

fn log_early_exit(error: &IngestError) {
    let stage = TaskStage::of_error(error);
    match error {
        IngestError::UnknownKind { .. } => {
            tracing::trace!(stage = %stage, "{}", error)
        }
        IngestError::AlreadyIngested { .. }
        | IngestError::Decode {
            source: HashError::UnsupportedFormat { .. },
            ..
        } => tracing::debug!(stage = %stage, "{}", error),
        IngestError::Serialize { .. } | IngestError::Persist { .. } => {
            tracing::error!(stage = %stage, "{}", error)
        }
        _ => tracing::warn!(stage = %stage, "failed to ingest: {}", error),
    }
}

/// Resolve `path` to absolute form and stat it
pub fn stat_file(path: &Path) -> Result<FileStat, IngestError> {
    let path = std::path::absolute(path).map_err(|e| IngestError::Resolve {
        path: path.to_path_buf(),
        source: e,
    })?;

    let meta = std::fs::metadata(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::NotFound { path: path.clone() }
        } else {
            IngestError::Stat {
                path: path.clone(),
                source: e,
            }
        }
    })?;

    if meta.is_dir() {
        return Err(IngestError::IsDirectory { path });
    }

    let modified = meta.modified().map_err(|e| IngestError::Stat {
        path: path.clone(),
        source: e,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(FileStat {
        name,
        size: meta.len(),
        mod_time: DateTime::<Utc>::from(modified),
        path,
    })
}

fn ingest_file(path: &Path, ctx: &TaskContext) -> Result<FingerprintRecord, IngestError> {
    let stat = stat_file(path)?;

    if check_existing(&stat, ctx.store.as_ref()) {
        return Err(IngestError::AlreadyIngested { path: stat.path });
    }

    let file = File::open(&stat.path).map_err(|e| IngestError::Open {
        path: stat.path.clone(),
        source: e,
    })?;

    let mut buf = ctx.buffers.acquire();
    let (image, kind) = decode_file(file, &stat)?;

    ctx.hasher
        .hash_into(&image, &mut buf)
        .map_err(|e| IngestError::Fingerprint {
            path: stat.path.clone(),
            source: e,
        })?;
    drop(image);

    let record = FingerprintRecord::new(stat, kind, buf.to_vec());
    buf.clear();
    record
        .write_json(&mut *buf)
        .map_err(|e| IngestError::Serialize {
            path: record.path.clone(),
            reason: e.to_string(),
        })?;

    ctx.store
        .put(&record.key(), &buf)
        .map_err(|e| IngestError::Persist {
            path: record.path.clone(),
            source: e,
        })?;

    tracing::info!(
        file = %record.name,
        algorithm = ctx.hasher.name(),
        fingerprint = %ImageHashValue::from_bytes(&record.fingerprint).to_hex(),
        data = %String::from_utf8_lossy(&buf),
        "ingested"
    );

    ctx.ingested
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(record.clone());

    buf.release();
    Ok(record)
}

/// Read and decode an open file. The file is closed when this returns.
fn decode_file(mut file: File, stat: &FileStat) -> Result<(DynamicImage, ImageKind), IngestError> {
    let bytes = read_file(&mut file, stat.size).map_err(|e| IngestError::Read {
        path: stat.path.clone(),
        source: e,
    })?;

    let decode_error = |e| IngestError::Decode {
        path: stat.path.clone(),
        source: e,
    };

    let (format, kind) = sniff(&bytes).map_err(decode_error)?;
    if !kind.is_known() {
        return Err(IngestError::UnknownKind {
            path: stat.path.clone(),
        });
    }

    let image = decode_as(&bytes, format).map_err(decode_error)?;
    Ok((image, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::DifferenceHasher;
    use crate::core::store::InMemoryStore;
    use image::{ImageFormat, RgbImage};
    use tempfile::TempDir;

    fn create_context(store: Arc<InMemoryStore>) -> TaskContext {
        TaskContext {
            store,
            hasher: Arc::new(DifferenceHasher::default()),
            buffers: BufferPool::new(),
            ingested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn write_image(dir: &TempDir, name: &str, format: ImageFormat) -> std::path::PathBuf {
        let path = dir.path().join(name);
        RgbImage::from_fn(40, 30, |x, _| image::Rgb([(x * 6) as u8, 0, 0]))
            .save_with_format(&path, format)
            .unwrap();
        path
    }

    #[test]
    fn stat_reports_absolute_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_image(&temp_dir, "a.png", ImageFormat::Png);

        let stat = stat_file(&path).unwrap();

        assert!(stat.path.is_absolute());
        assert_eq!(stat.name, "a.png");
        assert_eq!(stat.size, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn directory_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = stat_file(temp_dir.path());

        assert!(matches!(result, Err(IngestError::IsDirectory { .. })));
    }

    #[test]
    fn missing_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = stat_file(&temp_dir.path().join("nope.png"));

        assert!(matches!(result, Err(IngestError::NotFound { .. })));
    }

    #[test]
    fn valid_image_is_persisted_and_collected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_image(&temp_dir, "a.png", ImageFormat::Png);
        let store = Arc::new(InMemoryStore::new());
        let ctx = create_context(Arc::clone(&store));

        assert_eq!(run(&path, &ctx), TaskOutcome::Ingested);

        let stored = store.get(&path.to_string_lossy()).unwrap().unwrap();
        let record = FingerprintRecord::from_slice(&stored).unwrap();
        assert_eq!(record.kind, ImageKind::Png);
        assert_eq!(record.fingerprint.len(), 8);
        assert_eq!(ctx.ingested.lock().unwrap().as_slice(), &[record]);
        assert_eq!(ctx.buffers.idle(), 1);
    }

    #[test]
    fn unchanged_file_is_skipped_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_image(&temp_dir, "a.png", ImageFormat::Png);
        let store = Arc::new(InMemoryStore::new());
        let ctx = create_context(Arc::clone(&store));

        assert_eq!(run(&path, &ctx), TaskOutcome::Ingested);
        let first = store.get(&path.to_string_lossy()).unwrap();

        assert!(matches!(run(&path, &ctx), TaskOutcome::Skipped { .. }));
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get(&path.to_string_lossy()).unwrap(), first);
    }

    #[test]
    fn corrupt_jpeg_fails_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corrupt.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]).unwrap();
        let store = Arc::new(InMemoryStore::new());
        let ctx = create_context(Arc::clone(&store));

        assert!(matches!(run(&path, &ctx), TaskOutcome::Failed { .. }));
        assert!(store.is_empty());
        assert_eq!(ctx.buffers.idle(), 1);
    }

    #[test]
    fn unknown_kind_is_a_soft_skip() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_image(&temp_dir, "a.bmp", ImageFormat::Bmp);
        let store = Arc::new(InMemoryStore::new());
        let ctx = create_context(Arc::clone(&store));

        assert!(matches!(run(&path, &ctx), TaskOutcome::Skipped { .. }));
        assert!(store.is_empty());
    }

    struct FailingHasher;

    impl HashAlgorithm for FailingHasher {
        fn hash_into(&self, _image: &DynamicImage, _out: &mut Vec<u8>) -> Result<(), HashError> {
            Err(HashError::ComputationFailed("resize failed".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn hash_failure_fails_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_image(&temp_dir, "a.png", ImageFormat::Png);
        let store = Arc::new(InMemoryStore::new());
        let ctx = TaskContext {
            hasher: Arc::new(FailingHasher),
            ..create_context(Arc::clone(&store))
        };

        let outcome = run(&path, &ctx);

        assert!(matches!(outcome, TaskOutcome::Failed { ref reason } if reason.contains("resize failed")));
        assert!(store.is_empty());
        assert!(ctx.ingested.lock().unwrap().is_empty());
        assert_eq!(ctx.buffers.idle(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_fails_at_open() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = write_image(&temp_dir, "locked.png", ImageFormat::Png);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();
        if File::open(&path).is_ok() {
            // Permission bits do not apply to root
            return;
        }
        let store = Arc::new(InMemoryStore::new());
        let ctx = create_context(Arc::clone(&store));

        let outcome = run(&path, &ctx);

        assert!(matches!(outcome, TaskOutcome::Failed { ref reason } if reason.contains("Failed to open")));
        assert!(store.is_empty());
        assert_eq!(ctx.buffers.idle(), 0);
    }

    // macOS filesystems reject file names that are not UTF-8
    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn non_utf8_path_is_ingested_and_read_back() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir
            .path()
            .join(std::ffi::OsStr::from_bytes(b"caf\xe9.png"));
        RgbImage::from_fn(40, 30, |x, _| image::Rgb([(x * 6) as u8, 0, 0]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        let store = Arc::new(InMemoryStore::new());
        let ctx = create_context(Arc::clone(&store));

        assert_eq!(run(&path, &ctx), TaskOutcome::Ingested);

        let key = crate::core::record::store_key(&path);
        let stored = store.get(&key).unwrap().unwrap();
        let record = FingerprintRecord::from_slice(&stored).unwrap();
        assert_eq!(record.path, path);
        assert_eq!(record.fingerprint.len(), 8);

        // Unchanged on the second pass
        assert!(matches!(run(&path, &ctx), TaskOutcome::Skipped { .. }));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn error_stages_follow_the_task_order() {
        let path = std::path::PathBuf::from("/a.png");

        assert_eq!(
            TaskStage::of_error(&IngestError::IsDirectory { path: path.clone() }),
            TaskStage::Created
        );
        assert_eq!(
            TaskStage::of_error(&IngestError::AlreadyIngested { path: path.clone() }),
            TaskStage::StatChecked
        );
        assert_eq!(
            TaskStage::of_error(&IngestError::UnknownKind { path }),
            TaskStage::Decoded
        );
        assert_eq!(TaskStage::Fingerprinted.to_string(), "fingerprinted");
    }
}
