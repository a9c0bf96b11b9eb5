use std::collections::HashMap;

use crate::map::hex::Cube;
use crate::map::Map;

/// Cube-coordinate index over the tiles of one map.
///
/// Built once per map. Coordinates that fall off the map have no entry and
/// are skipped by every query here; they are never an error.
#[derive(Debug, Clone)]
pub struct HexGrid {
    cubes: Vec<Cube>,
    index: HashMap<Cube, usize>,
}

impl HexGrid {
    pub fn new(map: &Map) -> Self {
        let mut cubes = Vec::with_capacity(map.tiles.len());
        let mut index = HashMap::with_capacity(map.tiles.len());
        for (i, tile) in map.tiles.iter().enumerate() {
            let cube = Cube::from_offset(tile.row as i32, tile.col as i32);
            cubes.push(cube);
            index.insert(cube, i);
        }
        Self { cubes, index }
    }

    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    pub fn cube(&self, tile: usize) -> Cube {
        self.cubes[tile]
    }

    /// Tile index at a cube coordinate, or `None` when off the map.
    pub fn tile_at(&self, cube: Cube) -> Option<usize> {
        self.index.get(&cube).copied()
    }

    /// On-map tiles at exactly `radius` from `tile`.
    pub fn ring(&self, tile: usize, radius: u32) -> impl Iterator<Item = usize> + '_ {
        self.cubes[tile]
            .ring(radius)
            .filter_map(move |c| self.tile_at(c))
    }

    /// On-map tiles within `radius` of `tile`, excluding `tile` itself.
    pub fn cumulative_ring(&self, tile: usize, radius: u32) -> impl Iterator<Item = usize> + '_ {
        self.cubes[tile]
            .cumulative_ring(radius)
            .filter_map(move |c| self.tile_at(c))
            .filter(move |&other| other != tile)
    }

    pub fn neighbors(&self, tile: usize) -> impl Iterator<Item = usize> + '_ {
        self.ring(tile, 1)
    }

    pub fn distance(&self, a: usize, b: usize) -> u32 {
        self.cubes[a].distance(self.cubes[b])
    }
}
