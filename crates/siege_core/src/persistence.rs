//! Save records.
//!
//! Records are sparse: fields equal to their default are left out when
//! saving and restored as the default when loading. The per-unit `current`
//! block only exists once the match has started (turn > 0).
//!
//! ```json
//! {
//!   "turn": 3,
//!   "map": { "width": 2, "height": 1, "terrain": "a,c1" },
//!   "players": [
//!     { "id": 1, "ai": false, "gold": 40,
//!       "units": [ { "type": "soldier", "x": 0, "y": 0, "hitpoints": 7,
//!                    "current": { "mode": "done", "moved": true } } ] }
//!   ]
//! }
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, TerrainKey};
use crate::error::{GameError, Result};
use crate::grid::{Grid, MAX_CELLS};
use crate::player::PlayerId;
use crate::unit::{ActionFlags, UnitMode};

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero_i32(value: &i32) -> bool {
    *value == 0
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// A whole match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveState {
    /// Global turn counter.
    #[serde(default)]
    pub turn: u32,
    /// Terrain.
    pub map: MapRecord,
    /// Active players and their units.
    #[serde(default)]
    pub players: Vec<PlayerRecord>,
}

/// Terrain of a board as comma-joined ids in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapRecord {
    /// Width in cells.
    pub width: i32,
    /// Height in cells.
    pub height: i32,
    /// Comma-joined terrain ids.
    #[serde(default)]
    pub terrain: String,
}

/// One player seat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Seat id.
    pub id: PlayerId,
    /// Controlled by the AI layer.
    #[serde(default)]
    pub ai: bool,
    /// Gold in the treasury.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub gold: u32,
    /// Units owned by the player.
    #[serde(default)]
    pub units: Vec<UnitRecord>,
}

/// One unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Unit type id.
    #[serde(rename = "type")]
    pub type_id: String,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Attack earned from kills.
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub attack: i32,
    /// Defense modifier.
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub defense: i32,
    /// Hitpoints, when below the type's maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hitpoints: Option<u32>,
    /// Losing this unit defeats its owner.
    #[serde(
        default,
        rename = "mustSurvive",
        skip_serializing_if = "is_false"
    )]
    pub must_survive: bool,
    /// Turn state, present once the match has started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentRecord>,
}

impl UnitRecord {
    /// A fresh unit record with every optional field at its default.
    #[must_use]
    pub fn new(type_id: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            type_id: type_id.into(),
            x,
            y,
            attack: 0,
            defense: 0,
            hitpoints: None,
            must_survive: false,
            current: None,
        }
    }
}

/// Mid-turn state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrentRecord {
    /// Mode.
    #[serde(default)]
    pub mode: UnitMode,
    /// Moved this turn.
    #[serde(default, skip_serializing_if = "is_false")]
    pub moved: bool,
    /// Attacked this turn.
    #[serde(default, skip_serializing_if = "is_false")]
    pub attacked: bool,
    /// Captured this turn.
    #[serde(default, skip_serializing_if = "is_false")]
    pub captured: bool,
    /// Raised this turn.
    #[serde(default, skip_serializing_if = "is_false")]
    pub raised: bool,
}

impl CurrentRecord {
    /// Record a unit's mode and flags.
    #[must_use]
    pub const fn capture(mode: UnitMode, flags: ActionFlags) -> Self {
        Self {
            mode,
            moved: flags.moved,
            attacked: flags.attacked,
            captured: flags.captured,
            raised: flags.raised,
        }
    }

    /// The recorded flags.
    #[must_use]
    pub const fn flags(&self) -> ActionFlags {
        ActionFlags {
            moved: self.moved,
            attacked: self.attacked,
            captured: self.captured,
            raised: self.raised,
        }
    }
}

impl MapRecord {
    /// Record a grid.
    #[must_use]
    pub fn from_grid(catalog: &Catalog, grid: &Grid) -> Self {
        let terrain = grid
            .cells()
            .map(|(_, key)| catalog.terrain(key).id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            width: grid.width(),
            height: grid.height(),
            terrain,
        }
    }

    /// Rebuild the grid. Ids are assigned by position; empty, unknown or
    /// missing ids become `default_terrain`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownTerrain`] if `default_terrain` is not in
    /// the catalog and [`GameError::MapSizeMismatch`] if the size is not
    /// positive or exceeds [`MAX_CELLS`].
    pub fn to_grid(&self, catalog: &Catalog, default_terrain: &str) -> Result<Grid> {
        let fallback = catalog
            .terrain_key(default_terrain)
            .ok_or_else(|| GameError::UnknownTerrain(default_terrain.to_string()))?;
        let ids: Vec<&str> = self.terrain.split(',').map(str::trim).collect();
        let cells = usize::try_from(self.width)
            .ok()
            .zip(usize::try_from(self.height).ok())
            .and_then(|(w, h)| w.checked_mul(h))
            .filter(|&n| n > 0 && n <= MAX_CELLS)
            .ok_or(GameError::MapSizeMismatch {
                width: self.width,
                height: self.height,
                actual: ids.len(),
            })?;

        let terrain: Vec<TerrainKey> = (0..cells)
            .map(|i| match ids.get(i).copied().filter(|id| !id.is_empty()) {
                Some(id) => catalog.terrain_key(id).unwrap_or_else(|| {
                    debug!(id, "unknown terrain id, using default");
                    fallback
                }),
                None => fallback,
            })
            .collect();
        Grid::from_terrain(self.width, self.height, terrain)
    }
}

impl SaveState {
    /// Serialize as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| GameError::InvalidState(e.to_string()))
    }

    /// Parse a JSON save. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not a valid
    /// save record.
    pub fn from_json(text: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Hash of the whole record, stable within a process.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
