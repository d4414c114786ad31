//! The chunked map itself.

use crate::{chunk::MapChunk, MapError, TileStore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometry of a [`ChunkedMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Width of one tile in world units
    pub tile_width: u32,
    /// Height of one tile in world units
    pub tile_height: u32,
    /// Number of tiles along the x axis of one chunk
    pub chunk_columns: usize,
    /// Number of tiles along the y axis of one chunk
    pub chunk_rows: usize,
    /// Number of layers a tile position can hold
    pub layers: usize,
    /// Upper bound on the chunk grid width
    pub max_chunk_columns: usize,
    /// Upper bound on the chunk grid height
    pub max_chunk_rows: usize,
}

impl MapConfig {
    /// Number of tiles the map can span along each axis.
    pub fn tile_extent(&self) -> (usize, usize) {
        (
            self.max_chunk_columns.saturating_mul(self.chunk_columns),
            self.max_chunk_rows.saturating_mul(self.chunk_rows),
        )
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_width: 32,
            tile_height: 32,
            chunk_columns: 16,
            chunk_rows: 16,
            layers: 3,
            max_chunk_columns: 256,
            max_chunk_rows: 256,
        }
    }
}

/// Position of a chunk in the chunk grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub x: usize,
    pub y: usize,
}

/// Tile map made of lazily allocated chunks.
///
/// The chunk grid is always rectangular: `height()` rows of `width()` slots,
/// each slot either empty or holding a [`MapChunk`].
#[derive(Debug, Clone)]
pub struct ChunkedMap {
    config: MapConfig,
    chunks: Vec<Vec<Option<MapChunk>>>,
    width: usize,
}

impl ChunkedMap {
    pub fn new(config: MapConfig) -> Self {
        let config = MapConfig {
            chunk_columns: config.chunk_columns.max(1),
            chunk_rows: config.chunk_rows.max(1),
            ..config
        };
        Self {
            config,
            chunks: Vec::new(),
            width: 0,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Width of the map in chunks.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the map in chunks.
    pub fn height(&self) -> usize {
        self.chunks.len()
    }

    /// Number of allocated chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Chunk containing the given absolute tile position.
    pub fn chunk_coordinates(&self, x: u32, y: u32) -> ChunkCoord {
        ChunkCoord {
            x: x as usize / self.config.chunk_columns,
            y: y as usize / self.config.chunk_rows,
        }
    }

    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<&MapChunk> {
        self.chunks.get(coord.y)?.get(coord.x)?.as_ref()
    }

    /// Places (or removes) a chunk, growing the grid as needed.
    ///
    /// # Returns
    ///
    /// `MapError::OutOfBounds` when `coord` lies past `max_chunk_columns` or
    /// `max_chunk_rows`; the grid is left untouched in that case.
    pub fn set_chunk(&mut self, coord: ChunkCoord, chunk: Option<MapChunk>) -> Result<(), MapError> {
        if coord.x >= self.config.max_chunk_columns || coord.y >= self.config.max_chunk_rows {
            return Err(self.outside_grid(
                coord.x.saturating_mul(self.config.chunk_columns),
                coord.y.saturating_mul(self.config.chunk_rows),
            ));
        }
        self.ensure_capacity(coord);
        if let Some(slot) = self.chunks.get_mut(coord.y).and_then(|row| row.get_mut(coord.x)) {
            *slot = chunk;
        }
        Ok(())
    }

    fn outside_grid(&self, x: usize, y: usize) -> MapError {
        let (width, height) = self.config.tile_extent();
        MapError::OutOfBounds { x, y, width, height }
    }

    fn ensure_capacity(&mut self, coord: ChunkCoord) {
        if coord.x >= self.width {
            self.width = coord.x + 1;
            for row in &mut self.chunks {
                row.resize_with(self.width, || None);
            }
        }
        while self.chunks.len() <= coord.y {
            let mut row = Vec::with_capacity(self.width);
            row.resize_with(self.width, || None);
            self.chunks.push(row);
        }
    }

    /// Trims empty rows from the bottom and empty columns from the right.
    pub fn auto_crop(&mut self) {
        while self
            .chunks
            .last()
            .is_some_and(|row| row.iter().all(Option::is_none))
        {
            self.chunks.pop();
        }

        while self.width > 0
            && self
                .chunks
                .iter()
                .all(|row| row.get(self.width - 1).map_or(true, Option::is_none))
        {
            self.width -= 1;
            for row in &mut self.chunks {
                row.truncate(self.width);
            }
        }

        if self.chunks.is_empty() {
            self.width = 0;
        }
    }

    fn check_layer(&self, layer: usize) -> Result<(), MapError> {
        if layer < self.config.layers {
            Ok(())
        } else {
            Err(MapError::UnknownLayer {
                layer,
                layers: self.config.layers,
            })
        }
    }

    fn relative(&self, x: u32, y: u32) -> (usize, usize) {
        (
            x as usize % self.config.chunk_columns,
            y as usize % self.config.chunk_rows,
        )
    }

    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut MapChunk> {
        self.chunks.get_mut(coord.y)?.get_mut(coord.x)?.as_mut()
    }
}

impl TileStore for ChunkedMap {
    fn get_tile(&self, layer: usize, x: u32, y: u32) -> Result<Option<i32>, MapError> {
        self.check_layer(layer)?;
        let (rx, ry) = self.relative(x, y);
        Ok(self
            .get_chunk(self.chunk_coordinates(x, y))
            .and_then(|chunk| chunk.get_tile(layer, rx, ry)))
    }

    fn set_tile(&mut self, layer: usize, x: u32, y: u32, value: i32) -> Result<Option<i32>, MapError> {
        self.check_layer(layer)?;
        let coord = self.chunk_coordinates(x, y);
        let (rx, ry) = self.relative(x, y);

        if self.get_chunk(coord).is_none() {
            let chunk = MapChunk::new(self.config.chunk_columns, self.config.chunk_rows);
            self.set_chunk(coord, Some(chunk))
                .map_err(|_| self.outside_grid(x as usize, y as usize))?;
        }

        match self.chunk_mut(coord) {
            Some(chunk) => chunk.set_tile(layer, rx, ry, Some(value)),
            None => Ok(None),
        }
    }

    fn clear_tile(&mut self, layer: usize, x: u32, y: u32) -> Result<Option<i32>, MapError> {
        self.check_layer(layer)?;
        let coord = self.chunk_coordinates(x, y);
        let (rx, ry) = self.relative(x, y);

        let Some(chunk) = self.chunk_mut(coord) else {
            return Ok(None);
        };
        let previous = chunk.set_tile(layer, rx, ry, None)?;
        if chunk.is_empty() {
            self.set_chunk(coord, None)?;
        }
        Ok(previous)
    }
}

impl fmt::Display for ChunkedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.chunks {
            for slot in row {
                f.write_str(if slot.is_some() { "[C]" } else { "[ ]" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_map() -> ChunkedMap {
        ChunkedMap::new(MapConfig {
            chunk_columns: 4,
            chunk_rows: 4,
            layers: 2,
            ..Default::default()
        })
    }

    #[test]
    fn test_map_grows_lazily() {
        let mut map = small_map();
        assert_eq!((map.width(), map.height()), (0, 0));

        map.set_tile(0, 9, 5, 42).unwrap();
        assert_eq!(map.chunk_coordinates(9, 5), ChunkCoord { x: 2, y: 1 });
        assert_eq!((map.width(), map.height()), (3, 2));
        assert_eq!(map.chunk_count(), 1);
        assert_eq!(map.get_tile(0, 9, 5), Ok(Some(42)));
        assert_eq!(map.get_tile(1, 9, 5), Ok(None));
        assert_eq!(map.get_tile(0, 100, 100), Ok(None));
    }

    #[test]
    fn test_set_tile_returns_previous_value() {
        let mut map = small_map();
        assert_eq!(map.set_tile(1, 0, 0, 1), Ok(None));
        assert_eq!(map.set_tile(1, 0, 0, 2), Ok(Some(1)));
    }

    #[test]
    fn test_unknown_layer() {
        let mut map = small_map();
        assert_eq!(
            map.set_tile(2, 0, 0, 1),
            Err(MapError::UnknownLayer { layer: 2, layers: 2 })
        );
    }

    #[test]
    fn test_auto_crop_trims_trailing_empty_chunks() {
        let mut map = small_map();
        map.set_tile(0, 1, 1, 1).unwrap();
        map.set_tile(0, 13, 13, 2).unwrap();
        assert_eq!((map.width(), map.height()), (4, 4));

        assert_eq!(map.clear_tile(0, 13, 13), Ok(Some(2)));
        assert_eq!(map.chunk_count(), 1);

        map.auto_crop();
        assert_eq!((map.width(), map.height()), (1, 1));
        assert_eq!(map.get_tile(0, 1, 1), Ok(Some(1)));
    }

    #[test]
    fn test_auto_crop_keeps_leading_empty_chunks() {
        let mut map = small_map();
        map.set_tile(0, 5, 5, 1).unwrap();
        map.auto_crop();
        assert_eq!((map.width(), map.height()), (2, 2));
        assert_eq!(map.to_string(), "[ ][ ]\n[ ][C]\n");
    }

    #[test]
    fn test_auto_crop_on_emptied_map() {
        let mut map = small_map();
        map.set_tile(0, 5, 5, 1).unwrap();
        map.clear_tile(0, 5, 5).unwrap();
        map.auto_crop();
        assert_eq!((map.width(), map.height()), (0, 0));
    }

    #[test]
    fn test_set_tile_past_grid_limit() {
        let mut map = ChunkedMap::new(MapConfig {
            chunk_columns: 4,
            chunk_rows: 4,
            max_chunk_columns: 2,
            max_chunk_rows: 3,
            ..Default::default()
        });

        assert_eq!(map.set_tile(0, 7, 11, 1), Ok(None));
        assert_eq!(
            map.set_tile(0, 8, 0, 1),
            Err(MapError::OutOfBounds { x: 8, y: 0, width: 8, height: 12 })
        );
        assert_eq!(
            map.set_tile(0, 0, u32::MAX, 1),
            Err(MapError::OutOfBounds { x: 0, y: u32::MAX as usize, width: 8, height: 12 })
        );
        assert_eq!((map.width(), map.height()), (2, 3));
        assert_eq!(map.get_tile(0, 0, u32::MAX), Ok(None));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MapConfig = serde_json::from_str(r#"{"layers": 1}"#).unwrap();
        assert_eq!(config.layers, 1);
        assert_eq!(config.max_chunk_rows, 256);
        assert_eq!(config.tile_extent(), (4096, 4096));
    }

    #[test]
    fn test_clear_missing_tile() {
        let mut map = small_map();
        assert_eq!(map.clear_tile(0, 3, 3), Ok(None));
        assert_eq!(map.height(), 0);
    }
}
