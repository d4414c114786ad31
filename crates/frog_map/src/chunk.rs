//! Chunks and their tile layers.

use crate::MapError;
use std::collections::BTreeMap;

/// A fixed-size grid of optional tile values, addressed relative to its chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLayer {
    tiles: Vec<Option<i32>>,
    width: usize,
    height: usize,
}

impl ChunkLayer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            tiles: vec![None; width * height],
            width,
            height,
        }
    }

    /// Tile at relative coordinates, `None` when unset or outside the layer.
    pub fn get_tile(&self, x: usize, y: usize) -> Option<i32> {
        if x < self.width && y < self.height {
            self.tiles.get(y * self.width + x).copied().flatten()
        } else {
            None
        }
    }

    /// Replaces the tile at relative coordinates, returning the old value.
    pub fn set_tile(&mut self, x: usize, y: usize, value: Option<i32>) -> Result<Option<i32>, MapError> {
        let out_of_bounds = MapError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        };
        if x >= self.width || y >= self.height {
            return Err(out_of_bounds);
        }

        let slot = self.tiles.get_mut(y * self.width + x).ok_or(out_of_bounds)?;
        Ok(std::mem::replace(slot, value))
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(Option::is_none)
    }
}

/// A chunk of the map: one [`ChunkLayer`] per populated layer index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapChunk {
    layers: BTreeMap<usize, ChunkLayer>,
    width: usize,
    height: usize,
}

impl MapChunk {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            layers: BTreeMap::new(),
            width,
            height,
        }
    }

    pub fn has_layer(&self, layer: usize) -> bool {
        self.layers.contains_key(&layer)
    }

    pub fn get_tile(&self, layer: usize, x: usize, y: usize) -> Option<i32> {
        self.layers.get(&layer).and_then(|l| l.get_tile(x, y))
    }

    /// Writes a tile, allocating the layer on first use.
    pub fn set_tile(&mut self, layer: usize, x: usize, y: usize, value: Option<i32>) -> Result<Option<i32>, MapError> {
        let (width, height) = (self.width, self.height);
        let previous = self
            .layers
            .entry(layer)
            .or_insert_with(|| ChunkLayer::new(width, height))
            .set_tile(x, y, value)?;

        if value.is_none() && self.layers.get(&layer).is_some_and(ChunkLayer::is_empty) {
            self.layers.remove(&layer);
        }
        Ok(previous)
    }

    /// True when no layer holds any tile.
    pub fn is_empty(&self) -> bool {
        self.layers.values().all(ChunkLayer::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_bounds() {
        let mut layer = ChunkLayer::new(4, 2);
        assert_eq!(layer.set_tile(3, 1, Some(7)), Ok(None));
        assert_eq!(layer.get_tile(3, 1), Some(7));
        assert_eq!(layer.get_tile(4, 1), None);
        assert!(matches!(layer.set_tile(4, 0, Some(1)), Err(MapError::OutOfBounds { .. })));
    }

    #[test]
    fn test_clearing_last_tile_drops_layer() {
        let mut chunk = MapChunk::new(2, 2);
        chunk.set_tile(1, 0, 0, Some(5)).unwrap();
        assert!(chunk.has_layer(1));

        assert_eq!(chunk.set_tile(1, 0, 0, None), Ok(Some(5)));
        assert!(!chunk.has_layer(1));
        assert!(chunk.is_empty());
    }
}
