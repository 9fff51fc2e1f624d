//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 10001;

/// Maximum accepted line length in bytes. Anything longer is treated as a
/// corrupted stream and kills that connection.
pub const MAX_LINE_LENGTH: usize = 512;

/// Default capacity of the session-to-node event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Default time to wait for session tasks to drain at shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for the floor node.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind_addr: SocketAddr,

    /// Maximum accepted line length in bytes.
    pub max_line_length: usize,

    /// Capacity of the session event channel into the node.
    pub event_buffer: usize,

    /// Time to wait for session tasks to finish at shutdown.
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_line_length: MAX_LINE_LENGTH,
            event_buffer: DEFAULT_EVENT_BUFFER,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified bind address.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Set the maximum line length.
    pub fn with_max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = len;
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Set the shutdown drain timeout.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_loopback());
        assert_eq!(config.max_line_length, MAX_LINE_LENGTH);
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER);
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new("127.0.0.1:9999".parse().unwrap())
            .with_max_line_length(64)
            .with_event_buffer(8)
            .with_drain_timeout(Duration::from_millis(500));

        assert_eq!(config.bind_addr.port(), 9999);
        assert_eq!(config.max_line_length, 64);
        assert_eq!(config.event_buffer, 8);
        assert_eq!(config.drain_timeout, Duration::from_millis(500));
    }
}
