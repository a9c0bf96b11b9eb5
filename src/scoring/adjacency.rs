//! Campus adjacency bonuses.
//!
//! Bonuses come in half points. The solver only works with integers, so each
//! model multiplies by one scale factor on the way in and divides by the same
//! factor on the way out.

use crate::map::tile::{BaseTerrain, Feature, Improvement, Tile};
use crate::map::{HexGrid, Map};

/// Bonus for each adjacent geothermal fissure or reef.
pub const NATURAL_WONDER_FEATURE_BONUS: f64 = 2.0;
/// Bonus for each adjacent mountain.
pub const MOUNTAIN_BONUS: f64 = 1.0;
/// Bonus for each adjacent tile holding any improvement or district.
pub const IMPROVEMENT_BONUS: f64 = 0.5;
/// Bonus for each adjacent rainforest.
pub const RAINFOREST_BONUS: f64 = 0.5;

/// What a single neighbor contributes to a campus next to it.
pub fn neighbor_bonus(neighbor: &Tile) -> f64 {
    let mut bonus = 0.0;
    if matches!(
        neighbor.feature,
        Feature::GeothermalFissure | Feature::Reef
    ) {
        bonus += NATURAL_WONDER_FEATURE_BONUS;
    }
    if neighbor.base_terrain == BaseTerrain::Mountains {
        bonus += MOUNTAIN_BONUS;
    }
    if neighbor.improvement != Improvement::None {
        bonus += IMPROVEMENT_BONUS;
    }
    if neighbor.feature == Feature::Rainforest {
        bonus += RAINFOREST_BONUS;
    }
    bonus
}

/// Static adjacency of a tile from its on-map radius-1 ring.
pub fn base_adjacency(map: &Map, grid: &HexGrid, tile: usize) -> f64 {
    grid.neighbors(tile)
        .map(|n| neighbor_bonus(&map.tiles[n]))
        .sum()
}

/// Scale a fractional score to solver units, rounding to the nearest unit.
pub fn scale_adjacency(value: f64, scale: u32) -> i64 {
    (value * scale as f64).round() as i64
}

/// Exact inverse of [`scale_adjacency`] for values on the scale grid.
pub fn unscale_adjacency(scaled: i64, scale: u32) -> f64 {
    scaled as f64 / scale as f64
}
