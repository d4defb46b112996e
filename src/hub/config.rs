//! Hub configuration

use std::time::Duration;

/// Tunables shared by every hub a registry creates
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Per-subscriber delivery queue depth (datagrams)
    pub queue_capacity: usize,

    /// Size of pooled receive buffers; must hold one datagram
    pub recv_buffer_size: usize,

    /// Idle receive buffers kept pooled between datagrams
    pub pool_capacity: usize,

    /// `SO_RCVBUF` requested on the source socket (0 = OS default)
    pub os_recv_buffer: usize,

    /// A single client write slower than this drops the connection
    pub write_timeout: Duration,

    /// A subscriber seeing no data for this long is disconnected
    pub idle_timeout: Duration,

    /// Pause after a transient read error before retrying
    pub read_retry_delay: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 20,
            recv_buffer_size: 2048,
            pool_capacity: 32,
            os_recv_buffer: 4 * 1024 * 1024, // 4MB
            write_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            read_retry_delay: Duration::from_millis(100),
        }
    }
}

impl HubConfig {
    /// Set the per-subscriber queue depth
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the client write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the subscriber idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the transient read-error retry delay
    pub fn read_retry_delay(mut self, delay: Duration) -> Self {
        self.read_retry_delay = delay;
        self
    }

    /// Set the requested OS receive buffer size
    pub fn os_recv_buffer(mut self, bytes: usize) -> Self {
        self.os_recv_buffer = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.queue_capacity, 20);
        assert_eq!(config.recv_buffer_size, 2048);
        assert_eq!(config.os_recv_buffer, 4 * 1024 * 1024);
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.read_retry_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .queue_capacity(64)
            .write_timeout(Duration::from_secs(1))
            .idle_timeout(Duration::from_secs(10))
            .read_retry_delay(Duration::from_millis(5))
            .os_recv_buffer(0);

        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.write_timeout, Duration::from_secs(1));
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
        assert_eq!(config.read_retry_delay, Duration::from_millis(5));
        assert_eq!(config.os_recv_buffer, 0);
    }
}
