//! Delivery of task results back toward the client.

use super::{ConnectionId, ConnectionSettings};
use crate::{error::ReportError, queue::CompletionListener};
use crossbeam::channel::{self, select, Receiver, Sender, TrySendError};
use frog_types::{MessageCodec, RequestResult};
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Where a finished result goes.
pub trait ResultReporter: Send + Sync {
    fn report(&self, result: &RequestResult) -> Result<(), ReportError>;
}

/// Queues the reply line of each result on the connection's outbox.
///
/// `report` never blocks. A full outbox means the client stopped reading:
/// its socket is shut down and the result is dropped.
pub struct SocketReporter {
    connection_id: ConnectionId,
    outbox: Sender<String>,
    capacity: usize,
    stream: TcpStream,
    codec: Arc<dyn MessageCodec>,
}

impl SocketReporter {
    /// Starts the reply writer thread of `stream`.
    ///
    /// # Returns
    ///
    /// The reporter to hand to a [`ConnectionResponder`], and the
    /// [`ReplyWriter`] owning the writer thread. The thread stops when the
    /// writer is closed or dropped, or when a write fails or times out.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use frog_server::connection::{ConnectionResponder, ConnectionSettings, SocketReporter};
    /// use frog_types::JsonCodec;
    /// use std::net::TcpStream;
    /// use std::sync::Arc;
    ///
    /// # fn main() -> std::io::Result<()> {
    /// let stream = TcpStream::connect("127.0.0.1:8080")?;
    /// let peer = stream.peer_addr()?;
    /// let (reporter, writer) = SocketReporter::spawn(1, stream, Arc::new(JsonCodec), &ConnectionSettings::default())?;
    /// let responder = ConnectionResponder::new(1, peer, Box::new(reporter));
    /// // ... attach `responder` to submitted tasks ...
    /// writer.close();
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(
        connection_id: ConnectionId,
        stream: TcpStream,
        codec: Arc<dyn MessageCodec>,
        settings: &ConnectionSettings,
    ) -> io::Result<(Self, ReplyWriter)> {
        stream.set_write_timeout(Some(settings.write_timeout))?;
        let capacity = settings.outbox_capacity.max(1);
        let (outbox, pending) = channel::bounded(capacity);
        let (close, closed) = channel::bounded(0);

        let writer_stream = stream.try_clone()?;
        let thread = thread::Builder::new()
            .name(format!("frog-conn-{connection_id}-writer"))
            .spawn(move || write_replies(connection_id, writer_stream, pending, closed))?;

        let reporter = Self {
            connection_id,
            outbox,
            capacity,
            stream,
            codec,
        };
        let writer = ReplyWriter {
            close: Some(close),
            thread: Some(thread),
        };
        Ok((reporter, writer))
    }
}

impl ResultReporter for SocketReporter {
    fn report(&self, result: &RequestResult) -> Result<(), ReportError> {
        let mut line = self.codec.encode(&result.reply_message())?;
        line.push('\n');

        match self.outbox.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Connection {}: {} replies pending, disconnecting slow client",
                    self.connection_id, self.capacity
                );
                let _ = self.stream.shutdown(Shutdown::Both);
                Err(ReportError::Backlog(self.capacity))
            }
            Err(TrySendError::Disconnected(_)) => Err(ReportError::Closed),
        }
    }
}

/// Owner of a connection's reply writer thread.
pub struct ReplyWriter {
    close: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ReplyWriter {
    /// Stops the writer thread and waits for it. Queued replies are dropped.
    pub fn close(mut self) {
        self.close.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Reply writer thread panicked");
            }
        }
    }
}

fn write_replies(id: ConnectionId, mut stream: TcpStream, pending: Receiver<String>, closed: Receiver<()>) {
    loop {
        let line = select! {
            recv(pending) -> line => line.ok(),
            recv(closed) -> _ => None,
        };
        let Some(line) = line else {
            break;
        };

        if let Err(e) = stream.write_all(line.as_bytes()).and_then(|()| stream.flush()) {
            warn!("Connection {}: reply write failed, closing: {}", id, e);
            let _ = stream.shutdown(Shutdown::Both);
            break;
        }
    }
    debug!("Connection {}: reply writer stopped", id);
}

/// Only logs results.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ResultReporter for LogReporter {
    fn report(&self, result: &RequestResult) -> Result<(), ReportError> {
        info!(
            "Result of {} request {}: {:?} {}",
            result.kind(),
            result.request_id(),
            result.status(),
            result.payload()
        );
        Ok(())
    }
}

/// Completion listener attached to every task a connection submits.
pub struct ConnectionResponder {
    connection_id: ConnectionId,
    peer: SocketAddr,
    reporter: Box<dyn ResultReporter>,
}

impl ConnectionResponder {
    pub fn new(connection_id: ConnectionId, peer: SocketAddr, reporter: Box<dyn ResultReporter>) -> Self {
        Self {
            connection_id,
            peer,
            reporter,
        }
    }
}

impl CompletionListener for ConnectionResponder {
    fn request_execution_finished(&self, result: RequestResult) {
        debug!(
            "Connection {} ({}): {} request {} finished with {:?}",
            self.connection_id,
            self.peer,
            result.kind(),
            result.request_id(),
            result.status()
        );
        if let Err(e) = self.reporter.report(&result) {
            warn!(
                "Connection {} ({}): could not report {} result: {}",
                self.connection_id,
                self.peer,
                result.kind(),
                e
            );
        }
    }
}
