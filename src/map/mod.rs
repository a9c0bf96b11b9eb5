pub mod generation;
pub mod grid;
pub mod hex;
pub mod tile;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
pub use grid::HexGrid;
pub use hex::Cube;
pub use tile::{BaseTerrain, Feature, Improvement, Resource, Tile};

/// A rectangular hex map stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub rows: u32,
    pub cols: u32,
    pub tiles: Vec<Tile>,
}

impl Map {
    /// Build a map, rejecting tile lists that break the row-major layout.
    pub fn new(rows: u32, cols: u32, tiles: Vec<Tile>) -> Result<Self, PlanError> {
        let map = Self { rows, cols, tiles };
        map.validate()?;
        Ok(map)
    }

    /// A map where every tile has the same base terrain.
    pub fn filled(rows: u32, cols: u32, terrain: BaseTerrain) -> Self {
        let tiles = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| Tile::new(row, col, terrain)))
            .collect();
        Self { rows, cols, tiles }
    }

    /// Check `tiles.len() == rows * cols` and that tile `i` sits at
    /// `(i / cols, i % cols)`.
    pub fn validate(&self) -> Result<(), PlanError> {
        let expected = self.rows as u64 * self.cols as u64;
        if self.tiles.len() as u64 != expected {
            return Err(PlanError::InvalidMapDimensions {
                rows: self.rows,
                cols: self.cols,
                tiles: self.tiles.len(),
            });
        }
        for (i, tile) in self.tiles.iter().enumerate() {
            let (row, col) = self.position(i);
            if tile.row != row || tile.col != col {
                return Err(PlanError::TileOutOfPlace {
                    index: i,
                    row: tile.row,
                    col: tile.col,
                });
            }
        }
        Ok(())
    }

    /// Row and column of the tile at a linear index.
    pub fn position(&self, index: usize) -> (u32, u32) {
        let cols = self.cols.max(1) as usize;
        ((index / cols) as u32, (index % cols) as u32)
    }

    pub fn index_of(&self, row: u32, col: u32) -> Option<usize> {
        if row < self.rows && col < self.cols {
            Some(row as usize * self.cols as usize + col as usize)
        } else {
            None
        }
    }

    pub fn tile_mut(&mut self, row: u32, col: u32) -> Option<&mut Tile> {
        let index = self.index_of(row, col)?;
        self.tiles.get_mut(index)
    }

    /// Linear indices of every city tile, ascending.
    pub fn city_indices(&self) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_city())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count_improvement(&self, improvement: Improvement) -> usize {
        self.tiles
            .iter()
            .filter(|t| t.improvement == improvement)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_map_is_row_major() {
        let map = Map::filled(3, 4, BaseTerrain::Desert);
        assert_eq!(map.tiles.len(), 12);
        assert!(map.validate().is_ok());
        for (i, tile) in map.tiles.iter().enumerate() {
            assert_eq!(tile.row as usize, i / 4);
            assert_eq!(tile.col as usize, i % 4);
        }
    }

    #[test]
    fn wrong_tile_count_rejected() {
        let mut map = Map::filled(3, 3, BaseTerrain::Plains);
        map.tiles.pop();
        let err = Map::new(map.rows, map.cols, map.tiles).unwrap_err();
        assert!(matches!(
            err,
            PlanError::InvalidMapDimensions {
                rows: 3,
                cols: 3,
                tiles: 8
            }
        ));
    }

    #[test]
    fn swapped_tiles_rejected() {
        let mut map = Map::filled(2, 2, BaseTerrain::Plains);
        map.tiles.swap(1, 2);
        let err = map.validate().unwrap_err();
        assert!(matches!(err, PlanError::TileOutOfPlace { index: 1, .. }));
    }

    #[test]
    fn empty_map_is_valid() {
        let map = Map::new(0, 0, Vec::new()).unwrap();
        assert!(map.city_indices().is_empty());
    }

    #[test]
    fn index_lookup_and_city_listing() {
        let mut map = Map::filled(3, 3, BaseTerrain::Plains);
        assert_eq!(map.index_of(1, 2), Some(5));
        assert_eq!(map.index_of(3, 0), None);
        map.tile_mut(2, 1).unwrap().improvement = Improvement::City;
        map.tile_mut(0, 0).unwrap().improvement = Improvement::City;
        assert_eq!(map.city_indices(), vec![0, 7]);
        assert_eq!(map.count_improvement(Improvement::City), 2);
    }
}
