//! Server configuration types and defaults.

use crate::connection::ConnectionSettings;
use crate::plugins::DEFAULT_HANDLERS;
use frog_map::MapConfig;
use frog_types::{DEFAULT_MAX_LINE_BYTES, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for a [`GameServer`](crate::GameServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the listener to
    pub bind_address: SocketAddr,

    /// Accepted sockets beyond this many live connections are closed immediately
    pub max_connections: usize,

    /// Size of the worker pool; 0 means one worker per CPU
    pub worker_threads: usize,

    /// Interval between two world ticks in milliseconds; 0 disables ticking
    pub tick_interval_ms: u64,

    /// Read timeout of connection sockets, bounding how long a connection
    /// worker takes to notice shutdown
    pub read_poll_interval_ms: u64,

    /// How long a reply write may block before the connection is dropped
    pub write_timeout_ms: u64,

    /// Replies queued per connection before a slow reader is disconnected
    pub outbox_capacity: usize,

    /// Longest accepted request line; longer lines are skipped
    pub max_line_bytes: usize,

    /// The only protocol version the handshake accepts
    pub protocol_version: String,

    /// Geometry of the world map
    pub map: MapConfig,

    /// Identifiers of the request handlers to load, in order
    pub handlers: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            worker_threads: 0,
            tick_interval_ms: 50,
            read_poll_interval_ms: 100,
            write_timeout_ms: 5000,
            outbox_capacity: 256,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            protocol_version: PROTOCOL_VERSION.to_string(),
            map: MapConfig::default(),
            handlers: DEFAULT_HANDLERS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    /// Effective pool size.
    pub fn worker_count(&self) -> usize {
        match self.worker_threads {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        (self.tick_interval_ms > 0).then(|| Duration::from_millis(self.tick_interval_ms))
    }

    pub fn read_poll_interval(&self) -> Duration {
        Duration::from_millis(self.read_poll_interval_ms.max(1))
    }

    /// Per-socket limits handed to every connection worker.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            poll_interval: self.read_poll_interval(),
            write_timeout: Duration::from_millis(self.write_timeout_ms.max(1)),
            outbox_capacity: self.outbox_capacity.max(1),
            max_line_bytes: self.max_line_bytes.max(1),
        }
    }
}
