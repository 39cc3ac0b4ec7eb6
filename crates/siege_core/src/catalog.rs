//! Terrain and unit type catalogs.
//!
//! Catalogs are built once from data (usually RON), validated, and then
//! shared read-only by every component. Runtime code refers to entries by
//! compact [`TerrainKey`] / [`UnitTypeKey`] indices; string ids only appear
//! in data files and save records.
//!
//! # Example RON
//!
//! ```ron
//! CatalogData(
//!     terrain: [
//!         Terrain(id: "a", name: "Plains", movement: 1),
//!         Terrain(id: "c", name: "Castle", movement: 1, defense: 3, capture: 10,
//!                 category: Some("castle"), income: 5, heal: 2, factory: true),
//!     ],
//!     units: [
//!         UnitType(id: "soldier", name: "Soldier", attack: 5, attack_bonus: 2,
//!                  defense: 2, hitpoints: 10, movement: 4, range_min: 1,
//!                  range_max: 1, cost: 100, capture: 10),
//!     ],
//! )
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::player::PlayerId;

/// Movement cost at or above which terrain cannot be entered.
pub const IMPASSABLE: u32 = 99;

/// Default movement budget for unit types that do not specify one.
pub const DEFAULT_MOVEMENT: u32 = 10;

/// Index of a terrain entry inside a [`Catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerrainKey(u16);

impl TerrainKey {
    /// Raw index into the catalog's terrain table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a unit type entry inside a [`Catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitTypeKey(u16);

impl UnitTypeKey {
    /// Raw index into the catalog's unit type table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

const fn impassable() -> u32 {
    IMPASSABLE
}

const fn default_movement() -> u32 {
    DEFAULT_MOVEMENT
}

const fn default_range() -> u32 {
    1
}

/// A terrain catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    /// Unique id, used in map records.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Grouping used to find the owned variant of a captured building.
    #[serde(default)]
    pub category: Option<String>,
    /// Base movement cost. [`IMPASSABLE`] or more blocks traversal.
    #[serde(default = "impassable")]
    pub movement: u32,
    /// Defense bonus granted to a unit standing here.
    #[serde(default)]
    pub defense: i32,
    /// Capture threshold; 0 means the terrain cannot be captured.
    #[serde(default)]
    pub capture: u32,
    /// Owning player, if any.
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// Gold granted to the owner at the start of each of their turns.
    #[serde(default)]
    pub income: u32,
    /// Hitpoints restored to a damaged unit starting its turn here.
    #[serde(default)]
    pub heal: u32,
    /// Terrain this becomes when repaired.
    #[serde(default)]
    pub repair: Option<String>,
    /// Units can be built here by the owner.
    #[serde(default)]
    pub factory: bool,
}

impl Terrain {
    /// Create passable, featureless terrain.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, movement: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: None,
            movement,
            defense: 0,
            capture: 0,
            owner: None,
            income: 0,
            heal: 0,
            repair: None,
            factory: false,
        }
    }

    /// Whether a unit of `unit_type` owned by `owner` may capture this terrain.
    #[must_use]
    pub fn is_capturable_by(&self, unit_type: &UnitType, owner: PlayerId) -> bool {
        self.capture > 0 && unit_type.capture >= self.capture && self.owner != Some(owner)
    }

    /// Whether a unit of `unit_type` may repair this terrain.
    #[must_use]
    pub fn is_repairable_by(&self, unit_type: &UnitType) -> bool {
        self.repair.is_some() && unit_type.repair
    }

    /// Whether this terrain heals units owned by `owner`.
    #[must_use]
    pub fn heals(&self, owner: PlayerId) -> bool {
        self.heal > 0 && self.owner.map_or(true, |p| p == owner)
    }
}

/// A unit type catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    /// Unique id, used in save records.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Base attack.
    pub attack: i32,
    /// Upper bound of the damage bonus added to a successful hit.
    #[serde(default)]
    pub attack_bonus: u32,
    /// Base defense.
    pub defense: i32,
    /// Maximum hitpoints.
    pub hitpoints: u32,
    /// Movement budget per turn.
    #[serde(default = "default_movement")]
    pub movement: u32,
    /// Minimum attack range (Manhattan).
    #[serde(default = "default_range")]
    pub range_min: u32,
    /// Maximum attack range (Manhattan).
    #[serde(default = "default_range")]
    pub range_max: u32,
    /// Gold cost to build; 0 means it cannot be built.
    #[serde(default)]
    pub cost: u32,
    /// Damage dealt by running into an enemy at the end of a move.
    #[serde(default)]
    pub bash: i32,
    /// Attack aura granted to adjacent allies.
    #[serde(default)]
    pub berserk: i32,
    /// Defense aura granted to adjacent allies.
    #[serde(default)]
    pub bless: i32,
    /// Capture strength.
    #[serde(default)]
    pub capture: u32,
    /// Splash damage applied to units adjacent to the target.
    #[serde(default)]
    pub explosive: i32,
    /// Unit type a grave left by this unit rises as.
    #[serde(default)]
    pub grave: Option<String>,
    /// Strikes first when attacked.
    #[serde(default)]
    pub first_strike: bool,
    /// May attack before moving.
    #[serde(default)]
    pub attack_before_move: bool,
    /// May either attack or move in a turn, not both.
    #[serde(default)]
    pub attack_or_move: bool,
    /// May raise graves.
    #[serde(default)]
    pub raise: bool,
    /// May repair terrain.
    #[serde(default)]
    pub repair: bool,
    /// Extra attack against specific unit type ids.
    #[serde(default)]
    pub attack_bonuses: BTreeMap<String, i32>,
    /// Movement cost overrides by terrain id.
    #[serde(default)]
    pub movement_costs: BTreeMap<String, u32>,
}

impl UnitType {
    /// Create a plain melee unit type with the given core stats.
    #[must_use]
    pub fn new(id: impl Into<String>, attack: i32, defense: i32, hitpoints: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            attack,
            attack_bonus: 0,
            defense,
            hitpoints,
            movement: DEFAULT_MOVEMENT,
            range_min: 1,
            range_max: 1,
            cost: 0,
            bash: 0,
            berserk: 0,
            bless: 0,
            capture: 0,
            explosive: 0,
            grave: None,
            first_strike: false,
            attack_before_move: false,
            attack_or_move: false,
            raise: false,
            repair: false,
            attack_bonuses: BTreeMap::new(),
            movement_costs: BTreeMap::new(),
        }
    }

    /// Copy this type under a new id so individual fields can be overridden.
    ///
    /// ```
    /// use siege_core::catalog::UnitType;
    ///
    /// let soldier = UnitType::new("soldier", 5, 2, 10);
    /// let veteran = UnitType { attack: 7, ..soldier.variant("veteran") };
    /// assert_eq!(veteran.defense, 2);
    /// assert_eq!(veteran.id, "veteran");
    /// ```
    #[must_use]
    pub fn variant(&self, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ..self.clone()
        }
    }

    /// Whether `distance` lies inside this type's attack range.
    #[must_use]
    pub const fn in_range(&self, distance: u32) -> bool {
        distance >= self.range_min && distance <= self.range_max
    }
}

/// Serialized catalog layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    /// Terrain entries.
    #[serde(default)]
    pub terrain: Vec<Terrain>,
    /// Unit type entries.
    #[serde(default)]
    pub units: Vec<UnitType>,
}

/// Immutable terrain and unit type tables.
#[derive(Debug, Clone)]
pub struct Catalog {
    terrains: Vec<Terrain>,
    unit_types: Vec<UnitType>,
    terrain_keys: HashMap<String, TerrainKey>,
    unit_type_keys: HashMap<String, UnitTypeKey>,
}

impl Catalog {
    /// Build and validate a catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if ids are duplicated, cross references point at
    /// unknown entries, or a unit type has an empty attack range.
    pub fn new(terrains: Vec<Terrain>, unit_types: Vec<UnitType>) -> Result<Self> {
        if terrains.len() > usize::from(u16::MAX) || unit_types.len() > usize::from(u16::MAX) {
            return Err(GameError::InvalidCatalog("too many entries".into()));
        }

        let mut terrain_keys = HashMap::with_capacity(terrains.len());
        for (i, terrain) in terrains.iter().enumerate() {
            if terrain_keys
                .insert(terrain.id.clone(), TerrainKey(i as u16))
                .is_some()
            {
                return Err(GameError::InvalidCatalog(format!(
                    "duplicate terrain id '{}'",
                    terrain.id
                )));
            }
        }

        let mut unit_type_keys = HashMap::with_capacity(unit_types.len());
        for (i, unit_type) in unit_types.iter().enumerate() {
            if unit_type_keys
                .insert(unit_type.id.clone(), UnitTypeKey(i as u16))
                .is_some()
            {
                return Err(GameError::InvalidCatalog(format!(
                    "duplicate unit type id '{}'",
                    unit_type.id
                )));
            }
        }

        let catalog = Self {
            terrains,
            unit_types,
            terrain_keys,
            unit_type_keys,
        };
        catalog.validate_references()?;
        Ok(catalog)
    }

    /// Build a catalog from its serialized form.
    pub fn from_data(data: CatalogData) -> Result<Self> {
        Self::new(data.terrain, data.units)
    }

    /// Parse a catalog from RON text. `origin` names the source in errors.
    pub fn from_ron_str(text: &str, origin: &str) -> Result<Self> {
        let data: CatalogData = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::from_data(data)
    }

    fn validate_references(&self) -> Result<()> {
        for terrain in &self.terrains {
            if let Some(target) = &terrain.repair {
                if !self.terrain_keys.contains_key(target) {
                    return Err(GameError::UnknownTerrain(target.clone()));
                }
            }
        }

        for unit_type in &self.unit_types {
            if unit_type.hitpoints == 0 {
                return Err(GameError::InvalidCatalog(format!(
                    "unit type '{}' has no hitpoints",
                    unit_type.id
                )));
            }
            if unit_type.range_min > unit_type.range_max {
                return Err(GameError::InvalidCatalog(format!(
                    "unit type '{}' has range {}-{}",
                    unit_type.id, unit_type.range_min, unit_type.range_max
                )));
            }
            if let Some(grave) = &unit_type.grave {
                if !self.unit_type_keys.contains_key(grave) {
                    return Err(GameError::UnknownUnitType(grave.clone()));
                }
            }
            if let Some(id) = unit_type
                .attack_bonuses
                .keys()
                .find(|id| !self.unit_type_keys.contains_key(*id))
            {
                return Err(GameError::UnknownUnitType(id.clone()));
            }
            if let Some(id) = unit_type
                .movement_costs
                .keys()
                .find(|id| !self.terrain_keys.contains_key(*id))
            {
                return Err(GameError::UnknownTerrain(id.clone()));
            }
        }

        Ok(())
    }

    /// Look up a terrain key by id.
    #[must_use]
    pub fn terrain_key(&self, id: &str) -> Option<TerrainKey> {
        self.terrain_keys.get(id).copied()
    }

    /// Terrain entry for a key issued by this catalog.
    #[must_use]
    pub fn terrain(&self, key: TerrainKey) -> &Terrain {
        &self.terrains[key.index()]
    }

    /// Look up a unit type key by id.
    #[must_use]
    pub fn unit_type_key(&self, id: &str) -> Option<UnitTypeKey> {
        self.unit_type_keys.get(id).copied()
    }

    /// Unit type entry for a key issued by this catalog.
    #[must_use]
    pub fn unit_type(&self, key: UnitTypeKey) -> &UnitType {
        &self.unit_types[key.index()]
    }

    /// All terrain entries with their keys, in catalog order.
    pub fn terrains(&self) -> impl Iterator<Item = (TerrainKey, &Terrain)> {
        self.terrains
            .iter()
            .enumerate()
            .map(|(i, t)| (TerrainKey(i as u16), t))
    }

    /// All unit type entries with their keys, in catalog order.
    pub fn unit_types(&self) -> impl Iterator<Item = (UnitTypeKey, &UnitType)> {
        self.unit_types
            .iter()
            .enumerate()
            .map(|(i, u)| (UnitTypeKey(i as u16), u))
    }

    /// Cost for `unit_type` to enter `terrain`.
    #[must_use]
    pub fn movement_cost(&self, unit_type: &UnitType, terrain: &Terrain) -> u32 {
        unit_type
            .movement_costs
            .get(&terrain.id)
            .copied()
            .filter(|&cost| cost > 0)
            .unwrap_or(terrain.movement)
    }

    /// Extra attack `attacker` gets against `defender`.
    #[must_use]
    pub fn attack_bonus(&self, attacker: &UnitType, defender: &UnitType) -> i32 {
        attacker
            .attack_bonuses
            .get(&defender.id)
            .copied()
            .unwrap_or(0)
    }

    /// The owned counterpart of a capturable terrain for `owner`.
    ///
    /// Matches on capture threshold and category, so a captured castle stays
    /// a castle and a village stays a village.
    #[must_use]
    pub fn captured_variant(&self, key: TerrainKey, owner: PlayerId) -> Option<TerrainKey> {
        let current = self.terrain(key);
        self.terrains()
            .find(|(_, t)| {
                t.capture == current.capture
                    && t.category == current.category
                    && t.owner == Some(owner)
            })
            .map(|(k, _)| k)
    }

    /// The terrain `key` becomes when repaired, if any.
    #[must_use]
    pub fn repaired_variant(&self, key: TerrainKey) -> Option<TerrainKey> {
        self.terrain(key)
            .repair
            .as_deref()
            .and_then(|id| self.terrain_key(id))
    }

    /// The unit type a grave left by `key` rises as, if any.
    #[must_use]
    pub fn grave_type(&self, key: UnitTypeKey) -> Option<UnitTypeKey> {
        self.unit_type(key)
            .grave
            .as_deref()
            .and_then(|id| self.unit_type_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        let plains = Terrain::new("a", "Plains", 1);
        let forest = Terrain {
            defense: 1,
            ..Terrain::new("f", "Forest", 2)
        };
        let ruin = Terrain {
            repair: Some("v0".into()),
            ..Terrain::new("ru", "Ruin", 1)
        };
        let village = Terrain {
            category: Some("village".into()),
            capture: 5,
            income: 2,
            ..Terrain::new("v0", "Village", 1)
        };
        let blue_village = Terrain {
            owner: Some(PlayerId(1)),
            ..village.clone()
        };
        let blue_village = Terrain {
            id: "v1".into(),
            ..blue_village
        };

        let mut soldier = UnitType::new("soldier", 5, 2, 10);
        soldier.capture = 5;
        soldier.movement_costs.insert("f".into(), 1);
        let mut archer = soldier.variant("archer");
        archer.range_min = 2;
        archer.range_max = 3;
        archer.attack_bonuses.insert("soldier".into(), 2);

        Catalog::new(
            vec![plains, forest, ruin, village, blue_village],
            vec![soldier, archer],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_by_id() {
        let catalog = sample();
        let key = catalog.terrain_key("f").unwrap();
        assert_eq!(catalog.terrain(key).name, "Forest");
        assert!(catalog.terrain_key("zz").is_none());
        assert!(catalog.unit_type_key("archer").is_some());
    }

    #[test]
    fn test_movement_cost_override() {
        let catalog = sample();
        let soldier = catalog.unit_type(catalog.unit_type_key("soldier").unwrap());
        let forest = catalog.terrain(catalog.terrain_key("f").unwrap());
        let plains = catalog.terrain(catalog.terrain_key("a").unwrap());
        assert_eq!(catalog.movement_cost(soldier, forest), 1);
        assert_eq!(catalog.movement_cost(soldier, plains), 1);
    }

    #[test]
    fn test_attack_bonus_table() {
        let catalog = sample();
        let soldier = catalog.unit_type(catalog.unit_type_key("soldier").unwrap());
        let archer = catalog.unit_type(catalog.unit_type_key("archer").unwrap());
        assert_eq!(catalog.attack_bonus(archer, soldier), 2);
        assert_eq!(catalog.attack_bonus(soldier, archer), 0);
    }

    #[test]
    fn test_captured_and_repaired_variants() {
        let catalog = sample();
        let village = catalog.terrain_key("v0").unwrap();
        let owned = catalog.captured_variant(village, PlayerId(1)).unwrap();
        assert_eq!(catalog.terrain(owned).id, "v1");
        assert!(catalog.captured_variant(village, PlayerId(2)).is_none());

        let ruin = catalog.terrain_key("ru").unwrap();
        assert_eq!(catalog.repaired_variant(ruin), Some(village));
    }

    #[test]
    fn test_capture_rules() {
        let catalog = sample();
        let soldier = catalog.unit_type(catalog.unit_type_key("soldier").unwrap());
        let village = catalog.terrain(catalog.terrain_key("v0").unwrap());
        let owned = catalog.terrain(catalog.terrain_key("v1").unwrap());
        assert!(village.is_capturable_by(soldier, PlayerId(1)));
        assert!(!owned.is_capturable_by(soldier, PlayerId(1)));
        assert!(owned.is_capturable_by(soldier, PlayerId(2)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Catalog::new(
            vec![Terrain::new("a", "Plains", 1), Terrain::new("a", "Again", 1)],
            vec![],
        );
        assert!(matches!(result, Err(GameError::InvalidCatalog(_))));
    }

    #[test]
    fn test_dangling_references_rejected() {
        let mut ghost = UnitType::new("ghost", 1, 1, 1);
        ghost.grave = Some("nobody".into());
        let result = Catalog::new(vec![Terrain::new("a", "Plains", 1)], vec![ghost]);
        assert!(matches!(result, Err(GameError::UnknownUnitType(id)) if id == "nobody"));
    }

    #[test]
    fn test_from_ron() {
        let text = r#"
            CatalogData(
                terrain: [
                    Terrain(id: "a", name: "Plains", movement: 1),
                    Terrain(id: "w", name: "Wall"),
                ],
                units: [
                    UnitType(id: "soldier", name: "Soldier", attack: 5, defense: 2, hitpoints: 10),
                ],
            )
        "#;
        let catalog = Catalog::from_ron_str(text, "inline").unwrap();
        let wall = catalog.terrain(catalog.terrain_key("w").unwrap());
        assert_eq!(wall.movement, IMPASSABLE);
        let soldier = catalog.unit_type(catalog.unit_type_key("soldier").unwrap());
        assert_eq!(soldier.movement, DEFAULT_MOVEMENT);
        assert_eq!((soldier.range_min, soldier.range_max), (1, 1));
    }

    #[test]
    fn test_bad_ron_reports_origin() {
        let err = Catalog::from_ron_str("CatalogData(", "units.ron").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { path, .. } if path == "units.ron"));
    }
}
