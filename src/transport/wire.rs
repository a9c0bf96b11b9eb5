use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::map::tile::{BaseTerrain, Feature, Improvement, Resource, Tile};
use crate::map::Map;
use crate::scoring::Strategy;

/// Owner value on the wire for a tile no city owns.
pub const UNOWNED: i64 = -1;

/// Map as exchanged with clients: categories are numeric codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMap {
    pub rows: u32,
    pub cols: u32,
    pub tiles: Vec<WireTile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTile {
    pub row: u32,
    pub col: u32,
    pub base_terrain: u32,
    pub feature: u32,
    pub resource: Option<u32>,
    pub improvement: u32,
    pub food: i32,
    pub production: i32,
    pub yield_value: i32,
    pub owner: i64,
    pub science: f64,
}

impl From<&Tile> for WireTile {
    fn from(tile: &Tile) -> Self {
        WireTile {
            row: tile.row,
            col: tile.col,
            base_terrain: tile.base_terrain.code(),
            feature: tile.feature.code(),
            resource: tile.resource.map(Resource::code),
            improvement: tile.improvement.code(),
            food: tile.food,
            production: tile.production,
            yield_value: tile.yield_value,
            owner: tile.owner.map_or(UNOWNED, |o| o as i64),
            science: tile.science,
        }
    }
}

impl WireTile {
    fn into_tile(self) -> Result<Tile, PlanError> {
        Ok(Tile {
            row: self.row,
            col: self.col,
            base_terrain: BaseTerrain::from_code(self.base_terrain)?,
            feature: Feature::from_code(self.feature)?,
            resource: self.resource.map(Resource::from_code).transpose()?,
            improvement: Improvement::from_code(self.improvement)?,
            food: self.food,
            production: self.production,
            yield_value: self.yield_value,
            // Any negative owner is treated as the sentinel.
            owner: usize::try_from(self.owner).ok(),
            science: self.science,
        })
    }
}

impl From<&Map> for WireMap {
    fn from(map: &Map) -> Self {
        WireMap {
            rows: map.rows,
            cols: map.cols,
            tiles: map.tiles.iter().map(WireTile::from).collect(),
        }
    }
}

impl WireMap {
    /// Convert to a validated domain map.
    pub fn into_map(self) -> Result<Map, PlanError> {
        let tiles = self
            .tiles
            .into_iter()
            .map(WireTile::into_tile)
            .collect::<Result<Vec<_>, _>>()?;
        let map = Map::new(self.rows, self.cols, tiles)?;
        // Owners must point at a tile on this map.
        if let Some(tile) = map
            .tiles
            .iter()
            .find(|t| t.owner.is_some_and(|o| o >= map.tiles.len()))
        {
            return Err(PlanError::Decode(format!(
                "tile ({}, {}) names owner {:?}, outside a {}-tile map",
                tile.row,
                tile.col,
                tile.owner,
                map.tiles.len()
            )));
        }
        Ok(map)
    }
}

pub fn encode_map(map: &Map) -> Result<Vec<u8>, PlanError> {
    bincode::serialize(&WireMap::from(map)).map_err(|e| PlanError::Encode(e.to_string()))
}

pub fn decode_map(bytes: &[u8]) -> Result<Map, PlanError> {
    let wire: WireMap =
        bincode::deserialize(bytes).map_err(|e| PlanError::Decode(e.to_string()))?;
    wire.into_map()
}

/// JSON body posted by web clients: the bincode map as a byte array.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonEnvelope {
    pub data: EnvelopeData,
    #[serde(default)]
    pub strategy: Option<Strategy>,
}

/// The envelope's bytes, either as a JSON array or as a string that holds
/// one (`"[1,2,3]"`), which some clients send instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Bytes(Vec<u8>),
    Text(String),
}

impl EnvelopeData {
    pub fn into_bytes(self) -> Result<Vec<u8>, PlanError> {
        match self {
            EnvelopeData::Bytes(bytes) => Ok(bytes),
            EnvelopeData::Text(text) => serde_json::from_str(&text)
                .map_err(|e| PlanError::Decode(format!("envelope data string: {}", e))),
        }
    }
}

/// A request body that is either raw bincode or a [`JsonEnvelope`].
///
/// Returns the map and the strategy the envelope asked for, if any.
/// A body that looks like JSON but does not parse as an envelope is retried
/// as bincode, since a map with 123 rows also starts with `{`.
pub fn decode_request(body: &[u8]) -> Result<(Map, Option<Strategy>), PlanError> {
    let first = body.iter().find(|b| !b.is_ascii_whitespace());
    if first != Some(&b'{') {
        return Ok((decode_map(body)?, None));
    }
    match serde_json::from_slice::<JsonEnvelope>(body) {
        Ok(envelope) => {
            let bytes = envelope.data.into_bytes()?;
            Ok((decode_map(&bytes)?, envelope.strategy))
        }
        Err(json_err) => decode_map(body)
            .map(|map| (map, None))
            .map_err(|_| PlanError::Decode(json_err.to_string())),
    }
}
