//! # Frog Map
//!
//! A tile map split into fixed-size chunks. Chunks are allocated on first
//! write, the chunk grid grows to the right and downwards as needed, and
//! [`ChunkedMap::auto_crop`] trims trailing empty rows and columns.
//!
//! Request handlers only ever see the map through [`TileStore`].

pub mod chunk;
pub mod map;

pub use chunk::{ChunkLayer, MapChunk};
pub use map::{ChunkCoord, ChunkedMap, MapConfig};

use thiserror::Error;

/// Errors raised by tile access.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("Tile ({x}, {y}) is outside the {width}x{height} tile area")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("Unknown layer {layer} (map has {layers} layer(s))")]
    UnknownLayer { layer: usize, layers: usize },
}

/// Key-value-by-coordinate access to world tiles.
pub trait TileStore: Send + Sync {
    /// Value of the tile at absolute coordinates, `None` if never set.
    fn get_tile(&self, layer: usize, x: u32, y: u32) -> Result<Option<i32>, MapError>;

    /// Sets a tile and returns its previous value.
    fn set_tile(&mut self, layer: usize, x: u32, y: u32, value: i32) -> Result<Option<i32>, MapError>;

    /// Clears a tile and returns its previous value.
    fn clear_tile(&mut self, layer: usize, x: u32, y: u32) -> Result<Option<i32>, MapError>;
}
