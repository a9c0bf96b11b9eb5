//! Seeded demo maps for trying the planner without a game client.

use noise::{NoiseFn, Perlin};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::generation::GenerationParams;
use crate::map::tile::{BaseTerrain, Feature, Resource};
use crate::map::{HexGrid, Map};

const ELEVATION_SCALE: f64 = 0.18;
const MOISTURE_SCALE: f64 = 0.11;

/// Generate a map from the given parameters.
///
/// If `params.seed` is 0, a random seed is chosen. Returns the map and the
/// seed actually used, so the same map can be generated again.
pub fn generate_map(params: &GenerationParams) -> (Map, u64) {
    let seed = if params.seed == 0 {
        rand::thread_rng().r#gen()
    } else {
        params.seed
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut map = Map::filled(params.rows, params.cols, BaseTerrain::Plains);
    let grid = HexGrid::new(&map);
    let elevation = sample_noise(&map, seed as u32, ELEVATION_SCALE);
    let moisture = sample_noise(&map, seed.wrapping_add(1) as u32, MOISTURE_SCALE);

    assign_relief(&mut map, &elevation, params.ocean_ratio, params.mountain_ratio);
    assign_coast(&mut map, &grid);
    assign_climate(&mut map, &moisture);
    scatter_features(&mut map, &moisture, &mut rng, params.feature_density);
    scatter_resources(&mut map, &mut rng, params.resource_density);

    (map, seed)
}

/// Perlin noise sampled at each tile's hex center.
fn sample_noise(map: &Map, seed: u32, scale: f64) -> Vec<f64> {
    let perlin = Perlin::new(seed);
    map.tiles
        .iter()
        .map(|t| {
            // Odd rows sit half a tile to the right.
            let x = t.col as f64 + 0.5 * (t.row & 1) as f64;
            let y = t.row as f64 * 0.866;
            perlin.get([x * scale + 0.37, y * scale + 0.37])
        })
        .collect()
}

/// Ocean, hills and mountains by elevation percentile.
fn assign_relief(map: &mut Map, elevation: &[f64], ocean_ratio: f32, mountain_ratio: f32) {
    let mut indices: Vec<usize> = (0..map.tiles.len()).collect();
    indices.sort_by(|&a, &b| elevation[a].total_cmp(&elevation[b]));

    let ocean_count = (map.tiles.len() as f32 * ocean_ratio).round() as usize;
    let ocean_count = ocean_count.min(indices.len());
    for &idx in &indices[..ocean_count] {
        map.tiles[idx].base_terrain = BaseTerrain::Ocean;
    }

    let land = &indices[ocean_count..];
    let mountain_count = (land.len() as f32 * mountain_ratio).round() as usize;
    // Similar number of hills
    let hills_count = mountain_count;
    for (i, &idx) in land.iter().rev().enumerate() {
        if i < mountain_count {
            map.tiles[idx].base_terrain = BaseTerrain::Mountains;
        } else if i < mountain_count + hills_count {
            map.tiles[idx].base_terrain = BaseTerrain::PlainsHills;
        }
    }
}

/// Ocean tiles touching land become coast.
fn assign_coast(map: &mut Map, grid: &HexGrid) {
    let coast: Vec<usize> = (0..map.tiles.len())
        .filter(|&t| map.tiles[t].base_terrain == BaseTerrain::Ocean)
        .filter(|&t| grid.neighbors(t).any(|n| !is_water(map.tiles[n].base_terrain)))
        .collect();
    for t in coast {
        map.tiles[t].base_terrain = BaseTerrain::Coast;
    }
}

/// Latitude picks snow and tundra near the edges; moisture splits the rest
/// into desert, plains and grassland. Hills keep their relief.
fn assign_climate(map: &mut Map, moisture: &[f64]) {
    let last_row = map.rows.saturating_sub(1).max(1) as f64;
    for (t, tile) in map.tiles.iter_mut().enumerate() {
        let hills = match tile.base_terrain {
            BaseTerrain::Plains => false,
            BaseTerrain::PlainsHills => true,
            _ => continue,
        };
        let latitude = ((tile.row as f64 / last_row) - 0.5).abs() * 2.0;
        let flat = if latitude > 0.9 {
            BaseTerrain::Snow
        } else if latitude > 0.75 {
            BaseTerrain::Tundra
        } else if moisture[t] < -0.25 {
            BaseTerrain::Desert
        } else if moisture[t] > 0.15 {
            BaseTerrain::Grassland
        } else {
            BaseTerrain::Plains
        };
        tile.base_terrain = if hills { hilly(flat) } else { flat };
    }
}

fn hilly(flat: BaseTerrain) -> BaseTerrain {
    match flat {
        BaseTerrain::Grassland => BaseTerrain::GrasslandHills,
        BaseTerrain::Desert => BaseTerrain::DesertHills,
        BaseTerrain::Tundra => BaseTerrain::TundraHills,
        BaseTerrain::Snow => BaseTerrain::SnowHills,
        _ => BaseTerrain::PlainsHills,
    }
}

fn is_water(terrain: BaseTerrain) -> bool {
    matches!(terrain, BaseTerrain::Ocean | BaseTerrain::Coast)
}

fn scatter_features(map: &mut Map, moisture: &[f64], rng: &mut impl Rng, density: f32) {
    for (t, tile) in map.tiles.iter_mut().enumerate() {
        if rng.r#gen::<f32>() >= density {
            continue;
        }
        // Natural wonders are rare on any terrain that can hold them.
        let rare = rng.r#gen::<f32>() < 0.05;
        tile.feature = match tile.base_terrain {
            BaseTerrain::Coast if rare => Feature::GeothermalFissure,
            BaseTerrain::Coast => Feature::Reef,
            BaseTerrain::Ocean | BaseTerrain::Mountains | BaseTerrain::Snow => continue,
            _ if rare => Feature::GeothermalFissure,
            BaseTerrain::Desert => Feature::Oasis,
            BaseTerrain::DesertHills => Feature::VolcanicSoil,
            BaseTerrain::Grassland if moisture[t] > 0.4 => Feature::Marsh,
            BaseTerrain::Grassland | BaseTerrain::Plains | BaseTerrain::GrasslandHills
                if moisture[t] > 0.2 =>
            {
                Feature::Rainforest
            }
            _ => Feature::Woods,
        };
    }
}

fn scatter_resources(map: &mut Map, rng: &mut impl Rng, density: f32) {
    for tile in &mut map.tiles {
        if rng.r#gen::<f32>() >= density {
            continue;
        }
        let candidates = resources_for(tile.base_terrain, tile.feature);
        if let Some(&resource) = candidates.choose(rng) {
            tile.resource = Some(resource);
        }
    }
}

fn resources_for(terrain: BaseTerrain, feature: Feature) -> &'static [Resource] {
    match (terrain, feature) {
        (BaseTerrain::Coast, Feature::Reef) => &[Resource::Pearls, Resource::Turtles],
        (BaseTerrain::Coast | BaseTerrain::Ocean, _) => {
            &[Resource::Fish, Resource::Crabs, Resource::Whales, Resource::Oil]
        }
        (BaseTerrain::Mountains, _) => &[],
        (_, Feature::Rainforest) => &[Resource::Bananas, Resource::Cocoa, Resource::Spices],
        (_, Feature::Woods) => &[Resource::Deer, Resource::Furs, Resource::Truffles],
        (_, Feature::Marsh) => &[Resource::Rice, Resource::Sugar],
        (BaseTerrain::Desert | BaseTerrain::DesertHills, _) => {
            &[Resource::Salt, Resource::Incense, Resource::Oil, Resource::Gypsum]
        }
        (BaseTerrain::Tundra | BaseTerrain::TundraHills | BaseTerrain::Snow, _) => {
            &[Resource::Furs, Resource::Deer, Resource::Oil, Resource::Uranium]
        }
        (
            BaseTerrain::PlainsHills
            | BaseTerrain::GrasslandHills
            | BaseTerrain::SnowHills,
            _,
        ) => &[
            Resource::Copper,
            Resource::Iron,
            Resource::Stone,
            Resource::Sheep,
            Resource::Silver,
        ],
        (BaseTerrain::Grassland, _) => &[Resource::Cattle, Resource::Horses, Resource::Marble],
        _ => &[Resource::Wheat, Resource::Maize, Resource::Horses, Resource::Cotton],
    }
}
