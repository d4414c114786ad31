//! The client connection: dial, handshake, authenticate, receive.

use crate::{
    config::ConnectionConfig,
    dialer::{Dialer, TcpDialer},
    dispatcher::{PacketDispatcher, PacketSubscriber, SubscriberId},
    error::{ClientError, ProtocolError},
    reader::MessageReaderLoop,
};
use frog_types::{
    ConnectRequest, ConnectResult, JsonCodec, LineEvent, LineReader, Message, MessageCodec, MessageKind,
    VersionHandshake, VersionHandshakeResult,
};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc, OnceLock,
};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, info, warn};

/// Lifecycle of a [`Connection`].
///
/// Authentication does not have its own state: a running connection is
/// authenticated once [`Connection::token`] returns a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    Dialing = 1,
    Handshaking = 2,
    Running = 3,
    Stopped = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Dialing,
            2 => Self::Handshaking,
            3 => Self::Running,
            4 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Dialing => "dialing",
            Self::Handshaking => "handshaking",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// State touched by both the caller's threads and the reader thread.
pub(crate) struct Shared {
    pub(crate) running: AtomicBool,
    state: AtomicU8,
    token: OnceLock<String>,
    writer: Mutex<Option<TcpStream>>,
    reader_id: Mutex<Option<ThreadId>>,
    dispatcher: PacketDispatcher,
}

impl Shared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            state: AtomicU8::new(ConnectionState::Idle as u8),
            token: OnceLock::new(),
            writer: Mutex::new(None),
            reader_id: Mutex::new(None),
            dispatcher: PacketDispatcher::new(),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Records the calling thread as this connection's reader.
    pub(crate) fn register_reader(&self) {
        *self.reader_id.lock() = Some(thread::current().id());
    }

    fn on_reader_thread(&self) -> bool {
        *self.reader_id.lock() == Some(thread::current().id())
    }

    pub(crate) fn mark_stopped(&self) {
        self.running.store(false, Ordering::Release);
        self.set_state(ConnectionState::Stopped);
    }

    fn close_socket(&self) {
        if let Some(stream) = self.writer.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub(crate) fn on_message_received(&self, message: Message) {
        if message.kind() == MessageKind::ConnectResult && self.token.get().is_none() {
            self.capture_token(&message);
        }
        self.dispatcher.dispatch(&message);
    }

    fn capture_token(&self, message: &Message) {
        match message.payload::<ConnectResult>() {
            Ok(ConnectResult {
                result: true,
                token: Some(token),
                ..
            }) => {
                if self.token.set(token).is_ok() {
                    info!("🔑 Authentication token captured");
                }
            }
            Ok(ConnectResult { result: true, .. }) => warn!("Successful connect result carried no token"),
            Ok(rejected) => info!(
                "Authentication rejected: {}",
                rejected.reason.as_deref().unwrap_or("no reason given")
            ),
            Err(e) => warn!("Malformed connect result: {}", e),
        }
    }
}

/// A persistent, line-framed connection to the game server.
///
/// All methods take `&self` and are safe to call from any thread; share the
/// connection behind an `Arc` when several threads need it.
///
/// Lifecycle: `Idle → Dialing → Handshaking → Running → Stopped`. A failed
/// [`start`](Self::start) leaves the connection `Stopped`, and it can be
/// started again.
pub struct Connection {
    config: ConnectionConfig,
    codec: Arc<dyn MessageCodec>,
    dialer: Arc<dyn Dialer>,
    shared: Arc<Shared>,
    reader_thread: Mutex<Option<JoinHandle<()>>>,
    // Serialises start/disconnect against each other.
    lifecycle: Mutex<()>,
}

impl Connection {
    /// Creates an idle connection using the TCP dialer and the JSON codec.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            codec: Arc::new(JsonCodec),
            dialer: Arc::new(TcpDialer::default()),
            shared: Arc::new(Shared::new()),
            reader_thread: Mutex::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn with_dialer<D: Dialer + 'static>(mut self, dialer: D) -> Self {
        self.dialer = Arc::new(dialer);
        self
    }

    pub fn with_codec<C: MessageCodec + 'static>(mut self, codec: C) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to `address:port` and performs the version handshake.
    ///
    /// Does nothing if the connection is already running. Dial failures are
    /// retried `dial_retries` times with a fixed `retry_delay_ms` pause; a
    /// handshake failure is returned immediately and never retried.
    ///
    /// # Errors
    ///
    /// * [`ClientError::Connectivity`] - every dial attempt failed; no
    ///   handshake was sent
    /// * [`ClientError::Protocol`] - the server rejected our version, sent
    ///   something unexpected, or the socket dropped mid-handshake
    /// * [`ClientError::Io`] / [`ClientError::Codec`] - local socket or
    ///   encoding failures
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use frog_client::{ClientError, Connection, ConnectionConfig, ProtocolError};
    ///
    /// let connection = Connection::new(ConnectionConfig::default());
    /// match connection.start("127.0.0.1", 8080) {
    ///     Ok(()) => assert!(connection.is_running()),
    ///     Err(ClientError::Protocol(ProtocolError::VersionMismatch { remote, .. })) => {
    ///         eprintln!("server speaks {remote}");
    ///     }
    ///     Err(e) => eprintln!("could not connect: {e}"),
    /// }
    /// ```
    pub fn start(&self, address: &str, port: u16) -> Result<(), ClientError> {
        let _lifecycle = self.lifecycle.lock();
        if self.is_running() {
            debug!("Connection to {}:{} already running", address, port);
            return Ok(());
        }
        self.join_reader();

        match self.establish(address, port) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.shared.close_socket();
                self.shared.mark_stopped();
                warn!("Failed to start connection to {}:{}: {}", address, port, e);
                Err(e)
            }
        }
    }

    fn establish(&self, address: &str, port: u16) -> Result<(), ClientError> {
        self.shared.set_state(ConnectionState::Dialing);
        let stream = self.dial_with_retry(address, port)?;

        self.shared.set_state(ConnectionState::Handshaking);
        let reader = self.handshake(stream)?;

        let peer = format!("{address}:{port}");
        reader.get_ref().get_ref().set_read_timeout(Some(self.config.read_poll_interval()))?;
        self.shared.running.store(true, Ordering::Release);
        self.shared.set_state(ConnectionState::Running);

        let reader_loop =
            MessageReaderLoop::new(reader, Arc::clone(&self.codec), Arc::clone(&self.shared), peer.clone());
        let handle = thread::Builder::new()
            .name(format!("frog-reader-{peer}"))
            .spawn(move || reader_loop.run())?;
        *self.reader_thread.lock() = Some(handle);

        info!("✅ Connected to {} (protocol {})", peer, self.config.protocol_version);
        Ok(())
    }

    fn dial_with_retry(&self, address: &str, port: u16) -> Result<TcpStream, ClientError> {
        let attempts = self.config.dial_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                thread::sleep(self.config.retry_delay());
            }
            match self.dialer.dial(address, port) {
                Ok(stream) => {
                    debug!("Dialed {}:{} on attempt {}/{}", address, port, attempt, attempts);
                    return Ok(stream);
                }
                Err(e) => {
                    warn!("Dial attempt {}/{} to {}:{} failed: {}", attempt, attempts, address, port, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ClientError::Connectivity {
            address: format!("{address}:{port}"),
            attempts,
            source: last_error.unwrap_or_else(|| io::Error::other("no dial attempt was made")),
        })
    }

    /// Sends our version and performs the single blocking read for the verdict.
    fn handshake(&self, stream: TcpStream) -> Result<LineReader<BufReader<TcpStream>>, ClientError> {
        let timeout = self.config.handshake_timeout();
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_read_timeout(Some(timeout))?;

        let mut reader = LineReader::new(BufReader::new(stream.try_clone()?), self.config.max_line_bytes);
        *self.shared.writer.lock() = Some(stream);

        self.send_message(&Message::with_payload(
            MessageKind::ProtocolVersion,
            &VersionHandshake {
                version: self.config.protocol_version.clone(),
            },
        )?)?;

        let line = match reader.read_line() {
            Ok(LineEvent::Line(line)) => line,
            Ok(LineEvent::Eof) => {
                return Err(ProtocolError::HandshakeInterrupted(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection before answering the handshake",
                ))
                .into())
            }
            Ok(LineEvent::Oversized(bytes)) => {
                return Err(ProtocolError::OversizedResponse {
                    bytes,
                    limit: reader.max_line_bytes(),
                }
                .into())
            }
            Err(e) => return Err(ProtocolError::HandshakeInterrupted(e).into()),
        };

        let message = self
            .codec
            .decode(&String::from_utf8_lossy(&line))
            .map_err(ProtocolError::Malformed)?;
        if message.kind() != MessageKind::ProtocolVersionResult {
            return Err(ProtocolError::UnexpectedMessage(message.kind()).into());
        }

        let verdict: VersionHandshakeResult = message.payload().map_err(ProtocolError::Malformed)?;
        if !verdict.result {
            return Err(ProtocolError::VersionMismatch {
                local: self.config.protocol_version.clone(),
                remote: verdict.expected.unwrap_or_else(|| "an unknown version".to_string()),
            }
            .into());
        }

        Ok(reader)
    }

    /// Writes one encoded message followed by a newline.
    ///
    /// Fails fast with [`ClientError::NotConnected`] when there is no socket
    /// or its peer is gone.
    pub fn send_message(&self, message: &Message) -> Result<(), ClientError> {
        let mut line = self.codec.encode(message)?;
        line.push('\n');

        let mut writer = self.shared.writer.lock();
        let stream = writer.as_mut().ok_or(ClientError::NotConnected)?;
        if stream.peer_addr().is_err() {
            return Err(ClientError::NotConnected);
        }
        stream.write_all(line.as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    /// Sends an authentication request. The reply arrives on the reader
    /// thread; a successful one sets [`token`](Self::token).
    pub fn connect(&self, account: &str, password: &str) -> Result<(), ClientError> {
        if !self.is_running() {
            return Err(ClientError::NotConnected);
        }
        let request = ConnectRequest {
            account: account.to_string(),
            password: password.to_string(),
        };
        self.send_message(&Message::with_payload(MessageKind::Connect, &request)?)
    }

    /// Session token from the first successful connect result, if any.
    pub fn token(&self) -> Option<&str> {
        self.shared.token.get().map(String::as_str)
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.token.get().is_some()
    }

    /// Handles one inbound message: token capture, then fan-out.
    ///
    /// Invoked by the reader thread for every decoded line.
    pub fn on_message_received(&self, message: Message) {
        self.shared.on_message_received(message);
    }

    /// Marks the connection not running. The reader thread notices on its
    /// next poll, then closes the socket.
    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            info!("Stopping connection");
        }
        self.shared.set_state(ConnectionState::Stopped);
    }

    /// Stops the connection, closes the socket and waits for the reader thread.
    ///
    /// Safe to call from a subscriber. On the reader thread it only stops the
    /// connection and closes the socket; the reader exits once the subscriber
    /// returns and is joined by the next `start` or `disconnect`.
    pub fn disconnect(&self) {
        if self.shared.on_reader_thread() {
            // Another thread may hold `lifecycle` while joining this one.
            self.stop();
            self.shared.close_socket();
            return;
        }

        let _lifecycle = self.lifecycle.lock();
        self.stop();
        self.shared.close_socket();
        self.join_reader();
    }

    fn join_reader(&self) {
        let Some(handle) = self.reader_thread.lock().take() else {
            return;
        };
        // A subscriber may call disconnect from the reader thread itself.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("Reader thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// True while running and the socket still has a live peer.
    pub fn is_connected(&self) -> bool {
        self.is_running()
            && self
                .shared
                .writer
                .lock()
                .as_ref()
                .is_some_and(|stream| stream.peer_addr().is_ok())
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn add_packet_subscriber<S: PacketSubscriber + 'static>(&self, subscriber: S) -> SubscriberId {
        self.shared.dispatcher.subscribe(subscriber)
    }

    pub fn remove_packet_subscriber(&self, id: SubscriberId) -> bool {
        self.shared.dispatcher.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.dispatcher.subscriber_count()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
