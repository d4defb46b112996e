//! Traffic counters for hubs
//!
//! Counters are plain atomics updated from the reader task's hot path and
//! sampled by the status endpoint. No locking, no histograms.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-hub traffic counters
#[derive(Debug, Default)]
pub struct HubMetrics {
    inbound_bytes: AtomicU64,
    inbound_datagrams: AtomicU64,
}

impl HubMetrics {
    /// Create a zeroed counter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one received datagram of `n` bytes
    pub fn add_inbound(&self, n: usize) {
        self.inbound_bytes.fetch_add(n as u64, Ordering::Relaxed);
        self.inbound_datagrams.fetch_add(1, Ordering::Relaxed);
    }

    /// Total payload bytes received from the source
    pub fn inbound_bytes(&self) -> u64 {
        self.inbound_bytes.load(Ordering::Relaxed)
    }

    /// Total datagrams received from the source
    pub fn inbound_datagrams(&self) -> u64 {
        self.inbound_datagrams.load(Ordering::Relaxed)
    }
}
