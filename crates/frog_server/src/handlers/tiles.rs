//! Tile access against the shared world map.

use super::RequestHandler;
use crate::{
    error::HandlerError,
    world::{SharedWorld, WorldEvent},
};
use frog_map::TileStore;
use frog_systems::EventRouter;
use frog_types::{Request, RequestKind, TileQuery, TileQueryResult, TileUpdate, TileUpdateResult};
use serde_json::Value;

pub struct TileQueryHandler {
    world: SharedWorld,
}

impl TileQueryHandler {
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

impl RequestHandler for TileQueryHandler {
    fn name(&self) -> &'static str {
        "tile_query"
    }

    fn kind(&self) -> RequestKind {
        RequestKind::TileQuery
    }

    fn handle(&self, request: &Request) -> Result<Value, HandlerError> {
        let TileQuery { layer, x, y } = request.args_as()?;
        let value = self.world.read().get_tile(layer, x, y)?;
        Ok(serde_json::to_value(TileQueryResult { result: true, value })?)
    }
}

/// Sets or clears a tile and publishes the change as a world event.
pub struct TileUpdateHandler {
    world: SharedWorld,
    events: EventRouter<WorldEvent>,
}

impl TileUpdateHandler {
    pub fn new(world: SharedWorld, events: EventRouter<WorldEvent>) -> Self {
        Self { world, events }
    }
}

impl RequestHandler for TileUpdateHandler {
    fn name(&self) -> &'static str {
        "tile_update"
    }

    fn kind(&self) -> RequestKind {
        RequestKind::TileUpdate
    }

    fn handle(&self, request: &Request) -> Result<Value, HandlerError> {
        let TileUpdate { layer, x, y, value } = request.args_as()?;

        let (previous, event) = match value {
            Some(value) => (
                self.world.write().set_tile(layer, x, y, value)?,
                WorldEvent::TileChanged { layer, x, y, value },
            ),
            None => (
                self.world.write().clear_tile(layer, x, y)?,
                WorldEvent::TileCleared { layer, x, y },
            ),
        };
        self.events.route(event);

        Ok(serde_json::to_value(TileUpdateResult { result: true, previous })?)
    }
}
