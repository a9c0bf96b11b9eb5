use serde::{Deserialize, Serialize};

use crate::error::PlanError;

// === Enums ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseTerrain {
    Plains,
    Grassland,
    Desert,
    Tundra,
    Snow,
    Coast,
    Ocean,
    PlainsHills,
    GrasslandHills,
    DesertHills,
    TundraHills,
    SnowHills,
    Mountains,
    GrasslandFloodplains,
    DesertFloodplains,
    PlainsFloodplains,
}

impl BaseTerrain {
    /// Every variant, ordered by wire code.
    pub const ALL: [BaseTerrain; 16] = [
        BaseTerrain::Plains,
        BaseTerrain::Grassland,
        BaseTerrain::Desert,
        BaseTerrain::Tundra,
        BaseTerrain::Snow,
        BaseTerrain::Coast,
        BaseTerrain::Ocean,
        BaseTerrain::PlainsHills,
        BaseTerrain::GrasslandHills,
        BaseTerrain::DesertHills,
        BaseTerrain::TundraHills,
        BaseTerrain::SnowHills,
        BaseTerrain::Mountains,
        BaseTerrain::GrasslandFloodplains,
        BaseTerrain::DesertFloodplains,
        BaseTerrain::PlainsFloodplains,
    ];

    pub fn from_code(code: u32) -> Result<Self, PlanError> {
        from_code(&Self::ALL, code, "base terrain")
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Terrain that can host neither cities nor districts.
    pub fn is_unbuildable(self) -> bool {
        matches!(
            self,
            BaseTerrain::Coast | BaseTerrain::Ocean | BaseTerrain::Mountains
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Empty,
    Woods,
    Rainforest,
    Marsh,
    Oasis,
    GeothermalFissure,
    VolcanicSoil,
    Reef,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Empty,
        Feature::Woods,
        Feature::Rainforest,
        Feature::Marsh,
        Feature::Oasis,
        Feature::GeothermalFissure,
        Feature::VolcanicSoil,
        Feature::Reef,
    ];

    pub fn from_code(code: u32) -> Result<Self, PlanError> {
        from_code(&Self::ALL, code, "feature")
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Clear,
    Bananas,
    Copper,
    Cattle,
    Crabs,
    Deer,
    Fish,
    Maize,
    Rice,
    Sheep,
    Stone,
    Wheat,
    Amber,
    Cinnamon,
    Citrus,
    Cloves,
    Cocoa,
    Coffee,
    Cosmetics,
    Cotton,
    Dyes,
    Diamonds,
    Furs,
    Gypsum,
    Honey,
    Incense,
    Ivory,
    Jade,
    Jeans,
    Marble,
    Mercury,
    Olives,
    Pearls,
    Perfume,
    Salt,
    Silk,
    Silver,
    Spices,
    Sugar,
    Tea,
    Tobacco,
    Toys,
    Truffles,
    Turtles,
    Whales,
    Wine,
    Horses,
    Iron,
    Niter,
    Coal,
    Oil,
    Aluminum,
    Uranium,
}

impl Resource {
    pub const ALL: [Resource; 53] = [
        Resource::Clear,
        Resource::Bananas,
        Resource::Copper,
        Resource::Cattle,
        Resource::Crabs,
        Resource::Deer,
        Resource::Fish,
        Resource::Maize,
        Resource::Rice,
        Resource::Sheep,
        Resource::Stone,
        Resource::Wheat,
        Resource::Amber,
        Resource::Cinnamon,
        Resource::Citrus,
        Resource::Cloves,
        Resource::Cocoa,
        Resource::Coffee,
        Resource::Cosmetics,
        Resource::Cotton,
        Resource::Dyes,
        Resource::Diamonds,
        Resource::Furs,
        Resource::Gypsum,
        Resource::Honey,
        Resource::Incense,
        Resource::Ivory,
        Resource::Jade,
        Resource::Jeans,
        Resource::Marble,
        Resource::Mercury,
        Resource::Olives,
        Resource::Pearls,
        Resource::Perfume,
        Resource::Salt,
        Resource::Silk,
        Resource::Silver,
        Resource::Spices,
        Resource::Sugar,
        Resource::Tea,
        Resource::Tobacco,
        Resource::Toys,
        Resource::Truffles,
        Resource::Turtles,
        Resource::Whales,
        Resource::Wine,
        Resource::Horses,
        Resource::Iron,
        Resource::Niter,
        Resource::Coal,
        Resource::Oil,
        Resource::Aluminum,
        Resource::Uranium,
    ];

    pub fn from_code(code: u32) -> Result<Self, PlanError> {
        from_code(&Self::ALL, code, "resource")
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Improvement {
    None,
    City,
    Campus,
    Farm,
    Mine,
    Quarry,
    Plantation,
    Pasture,
    Camp,
    FishingBoats,
}

impl Improvement {
    pub const ALL: [Improvement; 10] = [
        Improvement::None,
        Improvement::City,
        Improvement::Campus,
        Improvement::Farm,
        Improvement::Mine,
        Improvement::Quarry,
        Improvement::Plantation,
        Improvement::Pasture,
        Improvement::Camp,
        Improvement::FishingBoats,
    ];

    pub fn from_code(code: u32) -> Result<Self, PlanError> {
        from_code(&Self::ALL, code, "improvement")
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

fn from_code<T: Copy>(all: &[T], code: u32, kind: &'static str) -> Result<T, PlanError> {
    all.get(code as usize)
        .copied()
        .ok_or_else(|| PlanError::UnknownCategory {
            kind,
            code: code.to_string(),
        })
}

// === Tile ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub row: u32,
    pub col: u32,
    pub base_terrain: BaseTerrain,
    pub feature: Feature,
    pub resource: Option<Resource>,
    pub improvement: Improvement,
    pub food: i32,
    pub production: i32,
    pub yield_value: i32,
    /// Linear index of the owning city tile.
    pub owner: Option<usize>,
    pub science: f64,
}

impl Tile {
    /// Create an unimproved tile with no computed outputs.
    pub fn new(row: u32, col: u32, base_terrain: BaseTerrain) -> Self {
        Self {
            row,
            col,
            base_terrain,
            feature: Feature::Empty,
            resource: None,
            improvement: Improvement::None,
            food: 0,
            production: 0,
            yield_value: 0,
            owner: None,
            science: 0.0,
        }
    }

    pub fn is_city(&self) -> bool {
        self.improvement == Improvement::City
    }
}
