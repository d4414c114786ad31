//! Connection settings.

use frog_types::{DEFAULT_MAX_LINE_BYTES, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for a [`Connection`](crate::Connection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Extra dial attempts after the first one fails
    pub dial_retries: u32,
    /// Fixed pause between two dial attempts
    pub retry_delay_ms: u64,
    /// Upper bound for the blocking handshake read and for socket writes
    pub handshake_timeout_ms: u64,
    /// How often the reader thread wakes up to check whether it should stop
    pub read_poll_interval_ms: u64,
    /// Longest server line accepted; longer lines are dropped
    pub max_line_bytes: usize,
    /// Version announced in the handshake
    pub protocol_version: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            dial_retries: 10,
            retry_delay_ms: 1000,
            handshake_timeout_ms: 5000,
            read_poll_interval_ms: 100,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    // A zero socket timeout is rejected by the OS, hence the 1 ms floor.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms.max(1))
    }

    pub fn read_poll_interval(&self) -> Duration {
        Duration::from_millis(self.read_poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.dial_retries, 10);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.protocol_version, "v0.0.0.1");
    }

    #[test]
    fn test_zero_timeouts_are_clamped() {
        let config = ConnectionConfig {
            handshake_timeout_ms: 0,
            read_poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.handshake_timeout(), Duration::from_millis(1));
        assert_eq!(config.read_poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: ConnectionConfig = serde_json::from_str(r#"{"dial_retries": 3}"#).unwrap();
        assert_eq!(config.dial_retries, 3);
        assert_eq!(config.retry_delay_ms, 1000);
    }
}
