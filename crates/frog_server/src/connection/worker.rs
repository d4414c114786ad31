//! The per-socket reader thread.

use super::{ConnectionId, ConnectionResponder, ConnectionSettings, ReplyWriter, SocketReporter};
use crate::{
    queue::{CompletionListener, RequestQueue, Task},
    shutdown::ShutdownSignal,
};
use frog_types::{LineEvent, LineReader, MessageCodec, Request};
use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Reads lines from one client and submits them as tasks.
///
/// The loop ends when the client hangs up, a read fails, the queue closes, or
/// shutdown is observed between reads. The socket carries a read timeout so
/// that the last case is noticed within one poll interval. Lines longer than
/// `max_line_bytes` are skipped.
pub struct ConnectionWorker {
    id: ConnectionId,
    peer: SocketAddr,
    reader: LineReader<BufReader<TcpStream>>,
    codec: Arc<dyn MessageCodec>,
    queue: RequestQueue,
    responder: Arc<dyn CompletionListener>,
    writer: Option<ReplyWriter>,
    shutdown: ShutdownSignal,
}

impl ConnectionWorker {
    /// Prepares a worker whose results are written back to the same socket
    /// by a reply writer thread, started here.
    ///
    /// # Errors
    ///
    /// Fails when the socket cannot be configured or cloned, or when the
    /// writer thread cannot be spawned.
    pub fn new(
        id: ConnectionId,
        stream: TcpStream,
        codec: Arc<dyn MessageCodec>,
        queue: RequestQueue,
        settings: ConnectionSettings,
    ) -> io::Result<Self> {
        configure(&stream, &settings)?;
        let peer = stream.peer_addr()?;
        let (reporter, writer) = SocketReporter::spawn(id, stream.try_clone()?, Arc::clone(&codec), &settings)?;
        let responder = Arc::new(ConnectionResponder::new(id, peer, Box::new(reporter)));

        let mut worker = Self::with_responder(id, stream, codec, queue, settings, responder)?;
        worker.writer = Some(writer);
        Ok(worker)
    }

    /// Prepares a worker that hands results to a custom listener.
    pub fn with_responder(
        id: ConnectionId,
        stream: TcpStream,
        codec: Arc<dyn MessageCodec>,
        queue: RequestQueue,
        settings: ConnectionSettings,
        responder: Arc<dyn CompletionListener>,
    ) -> io::Result<Self> {
        configure(&stream, &settings)?;
        let peer = stream.peer_addr()?;
        let shutdown = queue.shutdown_signal().clone();

        Ok(Self {
            id,
            peer,
            reader: LineReader::new(BufReader::new(stream), settings.max_line_bytes),
            codec,
            queue,
            responder,
            writer: None,
            shutdown,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn run(mut self) {
        info!("🔗 Connection {} opened from {}", self.id, self.peer);

        while !self.shutdown.is_triggered() {
            match self.reader.read_line() {
                Ok(LineEvent::Eof) => {
                    debug!("Connection {}: client hung up", self.id);
                    break;
                }
                Ok(LineEvent::Line(line)) => {
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Ok(LineEvent::Oversized(skipped)) => {
                    warn!(
                        "Connection {}: dropped a {}-byte line (limit {})",
                        self.id,
                        skipped,
                        self.reader.max_line_bytes()
                    );
                }
                // Partial input stays buffered until the rest arrives.
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("Connection {}: read failed: {}", self.id, e);
                    break;
                }
            }
        }

        let _ = self.reader.get_ref().get_ref().shutdown(Shutdown::Both);
        if let Some(writer) = self.writer.take() {
            writer.close();
        }
        info!("Connection {} from {} closed", self.id, self.peer);
    }

    /// Returns `false` once the queue refuses new work.
    fn handle_line(&self, raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            return true;
        }

        let message = match self.codec.decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Connection {}: dropping undecodable line: {}", self.id, e);
                return true;
            }
        };

        let request = match Request::from_message(&message) {
            Ok(request) => request,
            Err(e) => {
                warn!("Connection {}: dropping {} message: {}", self.id, message.kind(), e);
                return true;
            }
        };

        debug!("Connection {}: submitting {} request {}", self.id, request.kind(), request.id());
        match self.queue.submit(Task::new(request, Arc::clone(&self.responder))) {
            Ok(()) => true,
            Err(e) => {
                warn!("Connection {}: {}", self.id, e);
                false
            }
        }
    }
}

fn configure(stream: &TcpStream, settings: &ConnectionSettings) -> io::Result<()> {
    // Accepted sockets may inherit the listener's non-blocking mode.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(settings.poll_interval.max(Duration::from_millis(1))))?;
    stream.set_nodelay(true)
}
