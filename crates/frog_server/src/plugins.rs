//! Handler bootstrap.
//!
//! Handlers are compiled in. Startup reads the configured list of handler
//! identifiers and instantiates each one from a static table, so the set of
//! served request kinds is decided by configuration alone.

use crate::{
    error::PluginError,
    handlers::{
        ConnectHandler, HandlerContext, HandlerRegistry, RequestHandler, TileQueryHandler, TileUpdateHandler,
        VersionHandler,
    },
};
use std::sync::Arc;
use tracing::info;

type HandlerConstructor = fn(&HandlerContext) -> Arc<dyn RequestHandler>;

const AVAILABLE_HANDLERS: &[(&str, HandlerConstructor)] = &[
    ("protocol_version", version_handler),
    ("connect", connect_handler),
    ("tile_query", tile_query_handler),
    ("tile_update", tile_update_handler),
];

fn version_handler(ctx: &HandlerContext) -> Arc<dyn RequestHandler> {
    Arc::new(VersionHandler::new(ctx.protocol_version.clone()))
}

fn connect_handler(ctx: &HandlerContext) -> Arc<dyn RequestHandler> {
    Arc::new(ConnectHandler::new(ctx.events.clone()))
}

fn tile_query_handler(ctx: &HandlerContext) -> Arc<dyn RequestHandler> {
    Arc::new(TileQueryHandler::new(Arc::clone(&ctx.world)))
}

fn tile_update_handler(ctx: &HandlerContext) -> Arc<dyn RequestHandler> {
    Arc::new(TileUpdateHandler::new(Arc::clone(&ctx.world), ctx.events.clone()))
}

/// Handlers enabled when the configuration does not name any.
pub const DEFAULT_HANDLERS: [&str; 4] = ["protocol_version", "connect", "tile_query", "tile_update"];

/// Every identifier [`build_registry`] understands.
pub fn available_handlers() -> Vec<&'static str> {
    AVAILABLE_HANDLERS.iter().map(|(name, _)| *name).collect()
}

/// Instantiates the listed handlers in order.
///
/// This is the server's bootstrap step: it runs once, before any connection
/// is accepted, and the resulting registry is shared read-only by the pool.
///
/// # Arguments
///
/// * `identifiers` - Handler names, usually from the `[plugins]` config section
/// * `context` - World, event router and protocol version handed to each handler
///
/// # Returns
///
/// The populated [`HandlerRegistry`], or:
///
/// * [`PluginError::UnknownHandler`] - an identifier has no entry in the table
/// * [`PluginError::AlreadyLoaded`] - an identifier is listed twice
///
/// # Example
///
/// ```rust
/// use frog_map::{ChunkedMap, MapConfig};
/// use frog_server::{build_registry, world::world_system, HandlerContext, PluginError};
/// use frog_systems::SystemScheduler;
/// use parking_lot::RwLock;
/// use std::sync::Arc;
///
/// let world = Arc::new(RwLock::new(ChunkedMap::new(MapConfig::default())));
/// let (system, _stats) = world_system(Arc::clone(&world));
/// let mut scheduler = SystemScheduler::new();
/// scheduler.add_system(Box::new(system));
///
/// let context = HandlerContext {
///     world,
///     events: scheduler.router(),
///     protocol_version: frog_types::PROTOCOL_VERSION.to_string(),
/// };
/// let registry = build_registry(&["protocol_version", "connect"], &context).unwrap();
/// assert_eq!(registry.len(), 2);
///
/// let err = build_registry(&["weather"], &context).unwrap_err();
/// assert_eq!(err, PluginError::UnknownHandler("weather".to_string()));
/// ```
pub fn build_registry<S: AsRef<str>>(
    identifiers: &[S],
    context: &HandlerContext,
) -> Result<HandlerRegistry, PluginError> {
    let mut registry = HandlerRegistry::new();

    for identifier in identifiers {
        let identifier = identifier.as_ref();
        let (_, construct) = AVAILABLE_HANDLERS
            .iter()
            .find(|(name, _)| *name == identifier)
            .ok_or_else(|| PluginError::UnknownHandler(identifier.to_string()))?;
        registry.register(construct(context))?;
    }

    info!("🔌 Loaded {} handler(s): {:?}", registry.len(), registry.names());
    Ok(registry)
}
