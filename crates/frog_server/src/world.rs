//! The world subsystem: shared tile map plus the events that describe its changes.

use frog_map::ChunkedMap;
use frog_systems::{EventError, EventHandler, EventSystem, SystemEvent};
use parking_lot::RwLock;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::{debug, info};

/// The map every tile handler reads and writes.
pub type SharedWorld = Arc<RwLock<ChunkedMap>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    PlayerConnected { account: String },
    TileChanged { layer: usize, x: u32, y: u32, value: i32 },
    TileCleared { layer: usize, x: u32, y: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldEventKind {
    PlayerConnected,
    TileChanged,
    TileCleared,
}

impl SystemEvent for WorldEvent {
    type Kind = WorldEventKind;

    fn kind(&self) -> WorldEventKind {
        match self {
            WorldEvent::PlayerConnected { .. } => WorldEventKind::PlayerConnected,
            WorldEvent::TileChanged { .. } => WorldEventKind::TileChanged,
            WorldEvent::TileCleared { .. } => WorldEventKind::TileCleared,
        }
    }
}

/// Counters maintained by the world subsystem, readable from any thread.
#[derive(Debug, Default)]
pub struct WorldStats {
    players: AtomicUsize,
    tile_changes: AtomicU64,
    crops: AtomicU64,
}

impl WorldStats {
    /// Accounts that connected since startup.
    pub fn players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    pub fn tile_changes(&self) -> u64 {
        self.tile_changes.load(Ordering::Relaxed)
    }

    pub fn crops(&self) -> u64 {
        self.crops.load(Ordering::Relaxed)
    }
}

pub struct WorldHandler {
    world: SharedWorld,
    stats: Arc<WorldStats>,
    crop_pending: bool,
}

impl EventHandler<WorldEvent> for WorldHandler {
    fn event_received(&mut self, event: WorldEvent) -> Result<(), EventError> {
        match event {
            WorldEvent::PlayerConnected { account } => {
                let players = self.stats.players.fetch_add(1, Ordering::Relaxed) + 1;
                info!("🐸 {} joined the world ({} so far)", account, players);
            }
            WorldEvent::TileChanged { layer, x, y, value } => {
                self.stats.tile_changes.fetch_add(1, Ordering::Relaxed);
                debug!("Tile ({}, {}) on layer {} set to {}", x, y, layer, value);
            }
            WorldEvent::TileCleared { layer, x, y } => {
                self.stats.tile_changes.fetch_add(1, Ordering::Relaxed);
                self.crop_pending = true;
                debug!("Tile ({}, {}) on layer {} cleared", x, y, layer);
            }
        }
        Ok(())
    }

    fn on_tick(&mut self, _delta: Duration) {
        if !std::mem::take(&mut self.crop_pending) {
            return;
        }

        let mut world = self.world.write();
        let before = (world.width(), world.height());
        world.auto_crop();
        let after = (world.width(), world.height());
        self.stats.crops.fetch_add(1, Ordering::Relaxed);
        if before != after {
            debug!("Map cropped from {:?} to {:?} chunks", before, after);
        }
    }
}

/// Builds the world subsystem, accepting every world event kind.
pub fn world_system(world: SharedWorld) -> (EventSystem<WorldEvent, WorldHandler>, Arc<WorldStats>) {
    let stats = Arc::new(WorldStats::default());
    let handler = WorldHandler {
        world,
        stats: Arc::clone(&stats),
        crop_pending: false,
    };
    let system = EventSystem::new(
        "world",
        [
            WorldEventKind::PlayerConnected,
            WorldEventKind::TileChanged,
            WorldEventKind::TileCleared,
        ],
        handler,
    );
    (system, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frog_map::{MapConfig, TileStore};

    #[test]
    fn test_crop_runs_once_after_clear() {
        let world: SharedWorld = Arc::new(RwLock::new(ChunkedMap::new(MapConfig::default())));
        world.write().set_tile(0, 100, 100, 1).unwrap();
        let (mut system, stats) = world_system(Arc::clone(&world));

        system.push_event(WorldEvent::TileChanged { layer: 0, x: 100, y: 100, value: 1 });
        system.update(Duration::ZERO);
        assert_eq!(stats.crops(), 0);

        world.write().clear_tile(0, 100, 100).unwrap();
        system.push_event(WorldEvent::TileCleared { layer: 0, x: 100, y: 100 });
        system.update(Duration::ZERO);
        system.update(Duration::ZERO);

        assert_eq!(stats.crops(), 1);
        assert_eq!(stats.tile_changes(), 2);
        assert_eq!(world.read().height(), 0);
    }
}
