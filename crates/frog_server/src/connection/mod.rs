//! Per-socket connection handling.
//!
//! Each accepted socket gets one [`ConnectionWorker`] thread that turns
//! inbound lines into tasks, and one [`ConnectionResponder`] that receives
//! the results of those tasks from the pool. Replies leave through a bounded
//! outbox drained by a per-socket writer thread; pool workers never write to
//! sockets themselves.

pub mod responder;
pub mod worker;

pub use responder::{ConnectionResponder, LogReporter, ReplyWriter, ResultReporter, SocketReporter};
pub use worker::ConnectionWorker;

use frog_types::DEFAULT_MAX_LINE_BYTES;
use std::time::Duration;

/// Server-assigned identifier of an accepted socket.
pub type ConnectionId = u64;

/// Limits applied to every accepted socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Read timeout, bounding how long a worker takes to notice shutdown
    pub poll_interval: Duration,
    /// Write timeout of the reply writer
    pub write_timeout: Duration,
    /// Replies buffered before the connection is dropped as too slow
    pub outbox_capacity: usize,
    /// Longest request line kept; longer ones are skipped
    pub max_line_bytes: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            write_timeout: Duration::from_secs(5),
            outbox_capacity: 256,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}
