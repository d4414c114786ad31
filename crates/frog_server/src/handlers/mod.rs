//! Request handlers and the kind → handler lookup table.
//!
//! Every [`RequestKind`] is served by at most one [`RequestHandler`]. The
//! table is filled once at startup by [`build_registry`](crate::plugins::build_registry)
//! and is read-only afterwards, so workers share it without locking.

pub mod connect;
pub mod tiles;
pub mod version;

pub use connect::ConnectHandler;
pub use tiles::{TileQueryHandler, TileUpdateHandler};
pub use version::VersionHandler;

use crate::{
    error::{HandlerError, PluginError},
    world::{SharedWorld, WorldEvent},
};
use frog_systems::EventRouter;
use frog_types::{Request, RequestKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Execution logic for one request kind.
pub trait RequestHandler: Send + Sync {
    /// Identifier used in configuration and logs.
    fn name(&self) -> &'static str;

    fn kind(&self) -> RequestKind;

    /// Runs the request synchronously on a pool worker.
    ///
    /// The returned value becomes the reply payload; an error becomes a
    /// failure result carrying its message.
    fn handle(&self, request: &Request) -> Result<Value, HandlerError>;
}

/// What handlers may depend on.
#[derive(Clone)]
pub struct HandlerContext {
    pub world: SharedWorld,
    pub events: EventRouter<WorldEvent>,
    pub protocol_version: String,
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<RequestKind, Arc<dyn RequestHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn RequestHandler>) -> Result<(), PluginError> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(PluginError::AlreadyLoaded(handler.name().to_string()));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn get(&self, kind: RequestKind) -> Option<&Arc<dyn RequestHandler>> {
        self.handlers.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Names of the registered handlers, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.values().map(|h| h.name()).collect();
        names.sort_unstable();
        names
    }
}
