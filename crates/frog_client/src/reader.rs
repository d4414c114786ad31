//! The per-connection reader thread.

use crate::connection::Shared;
use frog_types::{LineEvent, LineReader, MessageCodec};
use std::io::{self, BufReader};
use std::net::{Shutdown, TcpStream};
use std::sync::{atomic::Ordering, Arc};
use tracing::{debug, info, warn};

/// Blocks on socket reads and forwards every decoded line to the connection.
///
/// The socket carries a read timeout, so the loop wakes up regularly to check
/// the connection's running flag. Lines over the configured limit are dropped.
/// On exit the socket is shut down and the connection is marked stopped.
pub(crate) struct MessageReaderLoop {
    reader: LineReader<BufReader<TcpStream>>,
    codec: Arc<dyn MessageCodec>,
    shared: Arc<Shared>,
    peer: String,
}

impl MessageReaderLoop {
    pub(crate) fn new(
        reader: LineReader<BufReader<TcpStream>>,
        codec: Arc<dyn MessageCodec>,
        shared: Arc<Shared>,
        peer: String,
    ) -> Self {
        Self {
            reader,
            codec,
            shared,
            peer,
        }
    }

    pub(crate) fn run(mut self) {
        self.shared.register_reader();
        debug!("Reader for {} started", self.peer);

        while self.shared.running.load(Ordering::Acquire) {
            match self.reader.read_line() {
                Ok(LineEvent::Eof) => {
                    info!("🔌 Server {} closed the connection", self.peer);
                    break;
                }
                Ok(LineEvent::Line(line)) => self.handle_line(&line),
                Ok(LineEvent::Oversized(skipped)) => warn!(
                    "Dropping a {}-byte line from {} (limit {})",
                    skipped,
                    self.peer,
                    self.reader.max_line_bytes()
                ),
                // Partial input stays buffered until the rest arrives.
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("Read from {} failed: {}", self.peer, e);
                    break;
                }
            }
        }

        self.shared.mark_stopped();
        let _ = self.reader.get_ref().get_ref().shutdown(Shutdown::Both);
        debug!("Reader for {} exited", self.peer);
    }

    fn handle_line(&self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            return;
        }

        match self.codec.decode(text) {
            Ok(message) => self.shared.on_message_received(message),
            Err(e) => warn!("Dropping undecodable line from {}: {}", self.peer, e),
        }
    }
}
