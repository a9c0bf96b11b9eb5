use std::collections::HashMap;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::map::tile::{BaseTerrain, Feature, Resource, Tile};
use crate::map::Map;

/// Food and production of a tile or tile component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Yields {
    pub food: i32,
    pub production: i32,
}

impl Yields {
    pub const fn new(food: i32, production: i32) -> Self {
        Self { food, production }
    }

    pub fn total(self) -> i32 {
        self.food + self.production
    }
}

impl Add for Yields {
    type Output = Yields;

    fn add(self, other: Yields) -> Yields {
        Yields {
            food: self.food + other.food,
            production: self.production + other.production,
        }
    }
}

/// Scoring mode for city siting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    MaxCities,
    MaxYield,
    MaxFood,
    MaxProduction,
}

impl Strategy {
    /// Scalar value of a tile's yields under this strategy.
    pub fn value(self, yields: Yields) -> i32 {
        match self {
            Strategy::MaxFood => yields.food,
            Strategy::MaxProduction => yields.production,
            Strategy::MaxCities | Strategy::MaxYield => yields.total(),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max_cities" => Ok(Strategy::MaxCities),
            "max_yield" => Ok(Strategy::MaxYield),
            "max_food" => Ok(Strategy::MaxFood),
            "max_production" => Ok(Strategy::MaxProduction),
            other => Err(format!(
                "unknown strategy '{}', expected max_cities, max_yield, max_food or max_production",
                other
            )),
        }
    }
}

/// Per-category yield overrides, as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct YieldOverrides {
    #[serde(default)]
    pub base_terrain: HashMap<BaseTerrain, [i32; 2]>,
    #[serde(default)]
    pub features: HashMap<Feature, [i32; 2]>,
    #[serde(default)]
    pub resources: HashMap<Resource, [i32; 2]>,
}

/// Lookup tables from terrain, feature and resource to yields.
///
/// Read-only once built; shared by reference across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldTable {
    base_terrain: HashMap<BaseTerrain, Yields>,
    features: HashMap<Feature, Yields>,
    resources: HashMap<Resource, Yields>,
}

impl Default for YieldTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl YieldTable {
    /// The standard game tables.
    pub fn standard() -> Self {
        Self {
            base_terrain: BaseTerrain::ALL
                .iter()
                .map(|&t| (t, standard_base_terrain(t)))
                .collect(),
            features: Feature::ALL
                .iter()
                .map(|&f| (f, standard_feature(f)))
                .collect(),
            resources: Resource::ALL
                .iter()
                .map(|&r| (r, standard_resource(r)))
                .collect(),
        }
    }

    /// Build a table from explicit entries. Call [`YieldTable::validate`]
    /// before use if the entries may be incomplete.
    pub fn from_parts(
        base_terrain: HashMap<BaseTerrain, Yields>,
        features: HashMap<Feature, Yields>,
        resources: HashMap<Resource, Yields>,
    ) -> Self {
        Self {
            base_terrain,
            features,
            resources,
        }
    }

    /// Standard tables with the given entries replaced.
    pub fn with_overrides(overrides: &YieldOverrides) -> Self {
        let mut table = Self::standard();
        for (&t, &[food, production]) in &overrides.base_terrain {
            table.base_terrain.insert(t, Yields::new(food, production));
        }
        for (&f, &[food, production]) in &overrides.features {
            table.features.insert(f, Yields::new(food, production));
        }
        for (&r, &[food, production]) in &overrides.resources {
            table.resources.insert(r, Yields::new(food, production));
        }
        table
    }

    /// Fail on the first category without an entry.
    pub fn validate(&self) -> Result<(), PlanError> {
        if let Some(t) = BaseTerrain::ALL
            .iter()
            .find(|t| !self.base_terrain.contains_key(t))
        {
            return Err(unknown("base terrain", t));
        }
        if let Some(f) = Feature::ALL.iter().find(|f| !self.features.contains_key(f)) {
            return Err(unknown("feature", f));
        }
        if let Some(r) = Resource::ALL.iter().find(|r| !self.resources.contains_key(r)) {
            return Err(unknown("resource", r));
        }
        Ok(())
    }

    /// Summed yields of a tile. A tile with no resource contributes (0, 0)
    /// for it; any other missing entry is an error.
    pub fn yields(&self, tile: &Tile) -> Result<Yields, PlanError> {
        let base = *self
            .base_terrain
            .get(&tile.base_terrain)
            .ok_or_else(|| unknown("base terrain", &tile.base_terrain))?;
        let feature = *self
            .features
            .get(&tile.feature)
            .ok_or_else(|| unknown("feature", &tile.feature))?;
        let resource = match tile.resource {
            Some(r) => *self
                .resources
                .get(&r)
                .ok_or_else(|| unknown("resource", &r))?,
            None => Yields::default(),
        };
        Ok(base + feature + resource)
    }

    pub fn score(&self, tile: &Tile, strategy: Strategy) -> Result<i32, PlanError> {
        Ok(strategy.value(self.yields(tile)?))
    }
}

fn unknown(kind: &'static str, value: &impl std::fmt::Debug) -> PlanError {
    PlanError::UnknownCategory {
        kind,
        code: format!("{:?}", value),
    }
}

/// Range of tile values produced by [`annotate_yields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldRange {
    pub min: i32,
    pub max: i32,
}

/// Write food, production and yield value into every tile.
///
/// Returns the min and max yield value, or `(0, 0)` for an empty map.
pub fn annotate_yields(
    map: &mut Map,
    table: &YieldTable,
    strategy: Strategy,
) -> Result<YieldRange, PlanError> {
    let mut range: Option<YieldRange> = None;
    for tile in &mut map.tiles {
        let yields = table.yields(tile)?;
        let value = strategy.value(yields);
        tile.food = yields.food;
        tile.production = yields.production;
        tile.yield_value = value;
        range = Some(match range {
            Some(r) => YieldRange {
                min: r.min.min(value),
                max: r.max.max(value),
            },
            None => YieldRange {
                min: value,
                max: value,
            },
        });
    }
    Ok(range.unwrap_or(YieldRange { min: 0, max: 0 }))
}

fn standard_base_terrain(terrain: BaseTerrain) -> Yields {
    let (food, production) = match terrain {
        BaseTerrain::Plains => (1, 1),
        BaseTerrain::Grassland => (2, 0),
        BaseTerrain::Desert => (0, 0),
        BaseTerrain::Tundra => (1, 0),
        BaseTerrain::Snow => (0, 0),
        BaseTerrain::Coast => (1, 0),
        BaseTerrain::Ocean => (1, 0),
        BaseTerrain::PlainsHills => (1, 2),
        BaseTerrain::GrasslandHills => (2, 1),
        BaseTerrain::DesertHills => (0, 1),
        BaseTerrain::TundraHills => (1, 1),
        BaseTerrain::SnowHills => (0, 1),
        BaseTerrain::Mountains => (0, 0),
        BaseTerrain::GrasslandFloodplains => (2, 0),
        BaseTerrain::DesertFloodplains => (3, 0),
        BaseTerrain::PlainsFloodplains => (1, 1),
    };
    Yields::new(food, production)
}

fn standard_feature(feature: Feature) -> Yields {
    let (food, production) = match feature {
        Feature::Empty => (0, 0),
        Feature::Woods => (0, 1),
        Feature::Rainforest => (1, 0),
        Feature::Marsh => (1, 0),
        Feature::Oasis => (3, 0),
        Feature::GeothermalFissure => (0, 0),
        Feature::VolcanicSoil => (0, 0),
        Feature::Reef => (1, 1),
    };
    Yields::new(food, production)
}

fn standard_resource(resource: Resource) -> Yields {
    let (food, production) = match resource {
        Resource::Bananas
        | Resource::Cattle
        | Resource::Fish
        | Resource::Rice
        | Resource::Wheat
        | Resource::Furs
        | Resource::Salt
        | Resource::Wine => (1, 0),
        Resource::Citrus | Resource::Honey | Resource::Spices | Resource::Sugar => (2, 0),
        Resource::Deer
        | Resource::Sheep
        | Resource::Stone
        | Resource::Gypsum
        | Resource::Ivory
        | Resource::Olives
        | Resource::Whales => (0, 1),
        Resource::Horses | Resource::Niter => (1, 1),
        Resource::Coal | Resource::Uranium => (0, 2),
        Resource::Oil => (0, 3),
        Resource::Clear
        | Resource::Copper
        | Resource::Crabs
        | Resource::Maize
        | Resource::Amber
        | Resource::Cinnamon
        | Resource::Cloves
        | Resource::Cocoa
        | Resource::Coffee
        | Resource::Cosmetics
        | Resource::Cotton
        | Resource::Dyes
        | Resource::Diamonds
        | Resource::Incense
        | Resource::Jade
        | Resource::Jeans
        | Resource::Marble
        | Resource::Mercury
        | Resource::Pearls
        | Resource::Perfume
        | Resource::Silk
        | Resource::Silver
        | Resource::Tea
        | Resource::Tobacco
        | Resource::Toys
        | Resource::Truffles
        | Resource::Turtles
        | Resource::Iron
        | Resource::Aluminum => (0, 0),
    };
    Yields::new(food, production)
}
