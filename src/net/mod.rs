//! UDP source plumbing
//!
//! Socket binding (multicast join with unicast fallback) and the reusable
//! receive-buffer pool backing the reader task.

pub mod bind;
pub mod pool;

pub use bind::{bind_source, BindMode, BoundSocket};
pub use pool::BufferPool;
