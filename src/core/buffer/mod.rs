//! # Buffer Module
//!
//! A pool of reusable scratch buffers for fingerprint and record
//! serialization, so each ingestion task doesn't allocate its own.
//!
//! A [`PooledBuffer`] goes back to the pool exactly once: either through
//! [`PooledBuffer::release`] or when it is dropped. Later releases are no-ops.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

/// Initial capacity of newly allocated buffers
pub const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024;

/// Maximum number of idle buffers kept for reuse
pub const DEFAULT_MAX_IDLE: usize = 64;

struct PoolInner {
    idle: Mutex<Vec<Vec<u8>>>,
    buffer_capacity: usize,
    max_idle: usize,
}

impl PoolInner {
    fn put_back(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

/// Thread-safe pool of byte buffers
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_IDLE)
    }

    /// Create a pool with a custom initial buffer capacity and idle limit
    pub fn with_limits(buffer_capacity: usize, max_idle: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::new()),
                buffer_capacity,
                max_idle,
            }),
        }
    }

    /// Take an empty buffer, reusing an idle one when available
    pub fn acquire(&self) -> PooledBuffer {
        let reused = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let mut buf = reused.unwrap_or_else(|| Vec::with_capacity(self.inner.buffer_capacity));
        buf.clear();

        PooledBuffer {
            buf,
            pool: Arc::clone(&self.inner),
            released: false,
        }
    }

    /// Number of buffers currently waiting for reuse
    pub fn idle(&self) -> usize {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer exclusively owned by one caller until released
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
    released: bool,
}

impl PooledBuffer {
    /// Return the buffer to its pool.
    ///
    /// Returns `false` if it had already been released. After release the
    /// handle is an empty, unpooled buffer.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.pool.put_back(std::mem::take(&mut self.buf));
        true
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn released_buffer_is_reused() {
        let pool = BufferPool::new();

        let mut buf = pool.acquire();
        buf.extend_from_slice(b"fingerprint");
        let capacity = buf.capacity();
        drop(buf);

        assert_eq!(pool.idle(), 1);

        let reused = pool.acquire();
        assert_eq!(pool.idle(), 0);
        assert!(reused.capacity() >= capacity);
    }

    #[test]
    fn reused_buffer_is_cleared() {
        let pool = BufferPool::new();

        let mut buf = pool.acquire();
        buf.extend_from_slice(b"stale bytes");
        drop(buf);

        let reused = pool.acquire();
        assert!(reused.is_empty());
    }

    #[test]
    fn double_release_is_a_no_op() {
        let pool = BufferPool::new();

        let mut buf = pool.acquire();
        assert!(buf.release());
        assert!(!buf.release());
        assert!(buf.is_released());
        drop(buf);

        // Explicit release plus drop still returned exactly one buffer
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn idle_buffers_are_capped() {
        let pool = BufferPool::with_limits(16, 2);

        let buffers: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        drop(buffers);

        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn concurrent_acquire_is_safe() {
        let pool = BufferPool::with_limits(16, 8);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = pool.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        assert!(buf.is_empty());
                        buf.push(i as u8);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(pool.idle() <= 8);
    }
}
