//! Receive-buffer pool
//!
//! The reader borrows a fixed-size buffer per receive and returns it
//! immediately after copying the payload out, so steady-state reception
//! allocates only the per-datagram payload. Pooled buffers are never handed
//! to subscribers; payloads are always fresh copies.

use std::sync::Mutex;

use bytes::BytesMut;

/// Pool of fixed-size receive buffers
#[derive(Debug)]
pub struct BufferPool {
    buffer_size: usize,
    max_idle: usize,
    idle: Mutex<Vec<BytesMut>>,
}

impl BufferPool {
    /// Create a pool handing out buffers of `buffer_size` bytes, keeping at
    /// most `max_idle` of them around between receives.
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            buffer_size,
            max_idle,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Take a buffer from the pool, allocating if none is idle.
    ///
    /// The returned buffer is fully initialised (`len == buffer_size`) so it
    /// can be passed straight to `recv_from`.
    pub fn acquire(&self) -> BytesMut {
        let reused = self.idle.lock().unwrap().pop();
        reused.unwrap_or_else(|| BytesMut::zeroed(self.buffer_size))
    }

    /// Return a buffer to the pool.
    ///
    /// Buffers that lost capacity (e.g. were split) are discarded; the pool
    /// only holds full-size buffers.
    pub fn release(&self, mut buf: BytesMut) {
        if buf.capacity() < self.buffer_size {
            return;
        }
        buf.resize(self.buffer_size, 0);

        let mut idle = self.idle.lock().unwrap();
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }

    /// Size of the buffers handed out by this pool
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}
