//! # Frog Server
//!
//! The server half of the Frog protocol, built on plain threads.
//!
//! ## Architecture Overview
//!
//! * **Acceptor** - one thread accepting sockets up to `max_connections`
//! * **[`ConnectionWorker`]** - one thread per socket; decodes each line into a
//!   [`Request`](frog_types::Request), wraps it in a [`Task`] and submits it
//! * **[`RequestQueue`]** - the single FIFO shared by all connections and workers
//! * **[`WorkerPool`]** - a fixed set of threads executing tasks through the
//!   [`HandlerRegistry`] and calling each task's [`CompletionListener`]
//! * **World subsystem** - an event system ticked on its own thread, fed by the
//!   handlers through an event router
//!
//! ### Request Flow
//!
//! 1. Client writes one encoded message per line
//! 2. The connection worker builds a request and submits a task
//! 3. A pool worker takes the task, runs the handler for its kind and builds a result
//! 4. The task's [`ConnectionResponder`] queues the reply on the connection's
//!    outbox and its [`ReplyWriter`] thread writes it to the socket
//!
//! ```rust,no_run
//! use frog_server::{GameServer, ServerConfig};
//!
//! # fn main() -> Result<(), frog_server::ServerError> {
//! let handle = GameServer::new(ServerConfig::default())?.start()?;
//! println!("listening on {}", handle.local_addr());
//! handle.wait();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod plugins;
pub mod pool;
pub mod queue;
pub mod server;
pub mod shutdown;
pub mod world;

pub use config::ServerConfig;
pub use connection::{
    ConnectionResponder, ConnectionSettings, ConnectionWorker, LogReporter, ReplyWriter, ResultReporter,
    SocketReporter,
};
pub use error::{HandlerError, PluginError, QueueError, ReportError, ServerError};
pub use handlers::{HandlerContext, HandlerRegistry, RequestHandler};
pub use plugins::{available_handlers, build_registry, DEFAULT_HANDLERS};
pub use pool::{execute_request, WorkerPool};
pub use queue::{CompletionListener, RequestQueue, ResultHandle, Task};
pub use server::{GameServer, ServerHandle};
pub use shutdown::ShutdownSignal;
pub use world::{SharedWorld, WorldEvent, WorldEventKind, WorldStats};
