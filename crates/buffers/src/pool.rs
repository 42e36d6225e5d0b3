//! Shared pool of output buffers.

use parking_lot::Mutex;

/// Largest capacity a buffer may have and still be returned to the pool.
///
/// A one-off huge document would otherwise pin its allocation for the life
/// of the pool.
pub const MAX_POOLED_CAPACITY: usize = 64 * 1024;

/// Maximum number of idle buffers kept by a pool.
pub const MAX_POOLED_BUFFERS: usize = 32;

const INITIAL_CAPACITY: usize = 256;

/// A thread-safe pool of reusable byte buffers.
///
/// A buffer handed out by [`BufferPool::acquire`] is owned exclusively by the
/// caller until it is passed back to [`BufferPool::release`].
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    max_capacity: usize,
    max_buffers: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_limits(MAX_POOLED_CAPACITY, MAX_POOLED_BUFFERS)
    }

    pub fn with_limits(max_capacity: usize, max_buffers: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            max_capacity,
            max_buffers,
        }
    }

    /// Takes an empty buffer from the pool, allocating one if none is idle.
    pub fn acquire(&self) -> Vec<u8> {
        match self.buffers.lock().pop() {
            Some(mut buf) => {
                buf.clear();
                buf
            }
            None => Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Returns a buffer to the pool. Returns `false` when the buffer was
    /// dropped instead (too large, or the pool is full).
    pub fn release(&self, mut buf: Vec<u8>) -> bool {
        if buf.capacity() > self.max_capacity {
            tracing::trace!(
                capacity = buf.capacity(),
                max = self.max_capacity,
                "dropping oversized pooled buffer"
            );
            return false;
        }
        let mut buffers = self.buffers.lock();
        if buffers.len() >= self.max_buffers {
            return false;
        }
        buf.clear();
        buffers.push(buf);
        true
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.buffers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_reuses_allocation() {
        let pool = BufferPool::new();
        let mut buf = pool.acquire();
        buf.extend_from_slice(b"hello");
        let ptr = buf.as_ptr();
        assert!(pool.release(buf));
        assert_eq!(pool.idle(), 1);
        let again = pool.acquire();
        assert!(again.is_empty());
        assert_eq!(again.as_ptr(), ptr);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_oversized_buffer_is_not_retained() {
        let pool = BufferPool::with_limits(1024, 4);
        let buf = Vec::with_capacity(4096);
        assert!(!pool.release(buf));
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = BufferPool::with_limits(1024, 2);
        assert!(pool.release(Vec::new()));
        assert!(pool.release(Vec::new()));
        assert!(!pool.release(Vec::new()));
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = BufferPool::new();
        std::thread::scope(|s| {
            for i in 0..8u8 {
                let pool = &pool;
                s.spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        assert!(buf.is_empty());
                        buf.push(i);
                        pool.release(buf);
                    }
                });
            }
        });
        assert!(pool.idle() <= MAX_POOLED_BUFFERS);
    }
}
