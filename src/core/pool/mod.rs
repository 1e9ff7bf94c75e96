//! # Pool Module
//!
//! Bounded worker pool for ingestion tasks.
//!
//! The pool has a fixed number of threads regardless of how many tasks are
//! submitted. A panic inside a task is caught at the task boundary and
//! logged together with the call site that submitted it; the worker thread
//! and every other task keep running.

use crate::error::PoolError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicBool, Ordering};

/// Default number of concurrent ingestion workers
pub const DEFAULT_WORKERS: usize = 25;

/// Fixed-size pool of ingestion workers
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    accepting: AtomicBool,
    size: usize,
}

impl WorkerPool {
    /// Build a pool with `size` worker threads
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|index| format!("ingest-{index}"))
            .panic_handler(|payload| {
                tracing::error!(panic = %panic_message(payload.as_ref()), "worker panic");
            })
            .build()
            .map_err(|e| PoolError::BuildFailed(e.to_string()))?;

        Ok(Self {
            pool,
            accepting: AtomicBool::new(true),
            size,
        })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `job` for execution on a worker.
    ///
    /// Fails once the pool has been shut down. Panics in `job` are logged
    /// with the caller's location and do not propagate.
    #[track_caller]
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let origin = Location::caller();
        self.pool.spawn(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                tracing::error!(
                    origin = %origin,
                    panic = %panic_message(payload.as_ref()),
                    "worker panic"
                );
            }
        });

        Ok(())
    }

    /// Stop accepting new tasks. Already queued tasks still run.
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
