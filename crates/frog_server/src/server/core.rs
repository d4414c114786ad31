//! Core server implementation and lifecycle management.

use crate::{
    config::ServerConfig,
    connection::{ConnectionId, ConnectionSettings, ConnectionWorker},
    error::ServerError,
    handlers::{HandlerContext, HandlerRegistry},
    plugins::build_registry,
    pool::WorkerPool,
    queue::RequestQueue,
    shutdown::ShutdownSignal,
    world::{world_system, SharedWorld, WorldEvent, WorldStats},
};
use frog_map::ChunkedMap;
use frog_systems::{DrainReport, SystemScheduler};
use frog_types::{JsonCodec, MessageCodec};
use parking_lot::RwLock;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// The game server before it starts listening.
///
/// [`GameServer::new`] loads the configured handlers and builds the world
/// subsystem; [`GameServer::start`] binds the listener and spawns the
/// threads, returning a [`ServerHandle`] that owns them.
pub struct GameServer {
    config: ServerConfig,
    world: SharedWorld,
    registry: Arc<HandlerRegistry>,
    scheduler: SystemScheduler<WorldEvent>,
    stats: Arc<WorldStats>,
    codec: Arc<dyn MessageCodec>,
    shutdown: ShutdownSignal,
}

impl GameServer {
    /// # Errors
    ///
    /// [`ServerError::Plugin`] if the handler list names an unknown or
    /// duplicate handler.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let world: SharedWorld = Arc::new(RwLock::new(ChunkedMap::new(config.map)));
        let (world_system, stats) = world_system(Arc::clone(&world));

        let mut scheduler = SystemScheduler::new();
        scheduler.add_system(Box::new(world_system));

        let context = HandlerContext {
            world: Arc::clone(&world),
            events: scheduler.router(),
            protocol_version: config.protocol_version.clone(),
        };
        let registry = build_registry(&config.handlers, &context)?;

        Ok(Self {
            config,
            world,
            registry: Arc::new(registry),
            scheduler,
            stats,
            codec: Arc::new(JsonCodec),
            shutdown: ShutdownSignal::new(),
        })
    }

    pub fn with_codec<C: MessageCodec + 'static>(mut self, codec: C) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn world(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }

    /// Binds the listener and starts the worker pool, the tick thread and the
    /// acceptor.
    ///
    /// # Returns
    ///
    /// A [`ServerHandle`] owning every spawned thread; dropping it or calling
    /// [`ServerHandle::shutdown`] stops them all. Fails with
    /// [`ServerError::Network`] when the address cannot be bound and with
    /// [`ServerError::Io`] when a thread cannot be spawned.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let address = self.config.bind_address;
        let listener = bind_listener(address)
            .map_err(|e| ServerError::Network(format!("failed to bind {address}: {e}")))?;
        let local_addr = listener.local_addr()?;
        info!("🚀 Starting game server on {}", local_addr);

        let mut handle = ServerHandle {
            local_addr,
            shutdown: self.shutdown.clone(),
            acceptor: None,
            ticker: None,
            pool: None,
            scheduler: None,
            active: Arc::new(AtomicUsize::new(0)),
            world: self.world,
            stats: self.stats,
        };

        let queue = RequestQueue::new(self.shutdown.clone());
        handle.pool = Some(WorkerPool::start(
            self.config.worker_count(),
            queue.clone(),
            self.registry,
        )?);

        match self.config.tick_interval() {
            Some(interval) => {
                info!("🕒 Server tick started with interval: {}ms", interval.as_millis());
                let scheduler = self.scheduler;
                let shutdown = self.shutdown.clone();
                handle.ticker = Some(
                    thread::Builder::new()
                        .name("frog-tick".to_string())
                        .spawn(move || run_ticks(scheduler, interval, &shutdown))?,
                );
            }
            None => {
                info!("⏸️ Server tick disabled (interval: 0ms)");
                handle.scheduler = Some(self.scheduler);
            }
        }

        let acceptor = Acceptor {
            listener,
            codec: self.codec,
            queue,
            shutdown: self.shutdown,
            max_connections: self.config.max_connections,
            poll_interval: self.config.read_poll_interval(),
            settings: self.config.connection_settings(),
            active: Arc::clone(&handle.active),
            next_id: 1,
            connections: Vec::new(),
        };
        handle.acceptor = Some(
            thread::Builder::new()
                .name("frog-acceptor".to_string())
                .spawn(move || acceptor.run())?,
        );

        info!("✅ Server listening on {}", local_addr);
        Ok(handle)
    }
}

fn bind_listener(address: SocketAddr) -> io::Result<TcpListener> {
    let domain = if address.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&address.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

fn run_ticks(mut scheduler: SystemScheduler<WorldEvent>, interval: Duration, shutdown: &ShutdownSignal) {
    let mut last = Instant::now();
    loop {
        let stopping = shutdown.wait_timeout(interval);
        let now = Instant::now();
        let report = scheduler.tick(now - last);
        last = now;
        if report.failed > 0 {
            warn!("Tick {}: {} of {} event(s) failed", scheduler.tick_count(), report.failed, report.processed);
        }
        // The final tick above drains whatever was routed before shutdown.
        if stopping {
            break;
        }
    }
    info!("Server tick stopped after {} tick(s)", scheduler.tick_count());
}

/// Decrements the live-connection count when a connection thread ends.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self(active)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct Acceptor {
    listener: TcpListener,
    codec: Arc<dyn MessageCodec>,
    queue: RequestQueue,
    shutdown: ShutdownSignal,
    max_connections: usize,
    poll_interval: Duration,
    settings: ConnectionSettings,
    active: Arc<AtomicUsize>,
    next_id: ConnectionId,
    connections: Vec<JoinHandle<()>>,
}

impl Acceptor {
    fn run(mut self) {
        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.shutdown.wait_timeout(self.poll_interval);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    self.shutdown.wait_timeout(self.poll_interval);
                }
            }
            self.connections.retain(|handle| !handle.is_finished());
        }

        info!("Acceptor stopped, waiting for {} connection(s)", self.connections.len());
        for handle in self.connections.drain(..) {
            if handle.join().is_err() {
                error!("Connection thread panicked");
            }
        }
    }

    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) {
        if self.active.load(Ordering::Acquire) >= self.max_connections {
            warn!("Connection limit of {} reached, rejecting {}", self.max_connections, peer);
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }

        let id = self.next_id;
        self.next_id += 1;
        let worker = match ConnectionWorker::new(
            id,
            stream,
            Arc::clone(&self.codec),
            self.queue.clone(),
            self.settings,
        ) {
            Ok(worker) => worker,
            Err(e) => {
                warn!("Could not set up connection from {}: {}", peer, e);
                return;
            }
        };

        let guard = ActiveGuard::new(Arc::clone(&self.active));
        let spawned = thread::Builder::new()
            .name(format!("frog-conn-{id}"))
            .spawn(move || {
                let _guard = guard;
                worker.run();
            });
        match spawned {
            Ok(handle) => self.connections.push(handle),
            Err(e) => error!("Failed to spawn thread for connection {}: {}", id, e),
        }
    }
}

/// A running server. Dropping the handle shuts the server down.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: ShutdownSignal,
    acceptor: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    pool: Option<WorkerPool>,
    scheduler: Option<SystemScheduler<WorldEvent>>,
    active: Arc<AtomicUsize>,
    world: SharedWorld,
    stats: Arc<WorldStats>,
}

impl ServerHandle {
    /// Address actually bound, useful when the configured port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal that stops the server when triggered from anywhere.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Tasks executed by the worker pool so far.
    pub fn executed_requests(&self) -> usize {
        self.pool.as_ref().map_or(0, WorkerPool::executed)
    }

    pub fn world(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }

    pub fn stats(&self) -> Arc<WorldStats> {
        Arc::clone(&self.stats)
    }

    /// Runs one world tick by hand. Only available when the tick thread is
    /// disabled (`tick_interval_ms = 0`); returns `None` otherwise.
    pub fn tick(&mut self, delta: Duration) -> Option<DrainReport> {
        self.scheduler.as_mut().map(|scheduler| scheduler.tick(delta))
    }

    /// Triggers shutdown and waits for every server thread to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Blocks until shutdown is triggered through [`shutdown_signal`](Self::shutdown_signal),
    /// then waits for every server thread to finish.
    pub fn wait(mut self) {
        self.shutdown.wait();
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.trigger();

        // The acceptor joins the connection workers it spawned.
        if let Some(acceptor) = self.acceptor.take() {
            if acceptor.join().is_err() {
                error!("Acceptor thread panicked");
            }
        }
        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                error!("Tick thread panicked");
            }
        }
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.tick(Duration::ZERO);
        }
        if let Some(pool) = self.pool.take() {
            debug!("Pool executed {} request(s)", pool.executed());
            pool.join();
            info!("Server stopped");
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
