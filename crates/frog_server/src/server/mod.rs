//! Server lifecycle: listener, acceptor, tick thread and worker pool.

mod core;

pub use self::core::{GameServer, ServerHandle};
