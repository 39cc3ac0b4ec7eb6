//! Units and the unit store.

use serde::{Deserialize, Serialize};

use crate::catalog::{UnitType, UnitTypeKey};
use crate::grid::Cell;
use crate::player::PlayerId;
use crate::pool::{Key, Pool};

/// Stable handle to a unit.
pub type UnitId = Key<Unit>;

/// Per-unit action state.
///
/// `Ready` and `Done` open and close a unit's turn; the others are entered
/// only by advancing the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitMode {
    /// Turn started, nothing chosen yet.
    #[default]
    Ready,
    /// Choosing a destination.
    Move,
    /// Choosing a target.
    Attack,
    /// Standing on capturable terrain.
    Capture,
    /// Standing on repairable terrain.
    Repair,
    /// Choosing a grave to raise.
    Raise,
    /// Finished for this turn.
    Done,
}

impl UnitMode {
    /// Short label for logs and overlays.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Move => "move",
            Self::Attack => "attack",
            Self::Capture => "capture",
            Self::Repair => "repair",
            Self::Raise => "raise",
            Self::Done => "done",
        }
    }
}

/// One-shot action flags. Set during a turn, cleared only at turn start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActionFlags {
    /// Moved (or gave up moving) this turn.
    #[serde(default)]
    pub moved: bool,
    /// Attacked (or gave up attacking) this turn.
    #[serde(default)]
    pub attacked: bool,
    /// Captured or repaired (or declined to) this turn.
    #[serde(default)]
    pub captured: bool,
    /// Raised (or declined to) this turn.
    #[serde(default)]
    pub raised: bool,
}

impl ActionFlags {
    /// Whether no flag is set.
    #[must_use]
    pub const fn is_clear(&self) -> bool {
        !(self.moved || self.attacked || self.captured || self.raised)
    }
}

/// A unit on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Catalog type.
    pub type_key: UnitTypeKey,
    /// Owning player.
    pub owner: PlayerId,
    /// Board position.
    pub cell: Cell,
    /// Current hitpoints.
    pub hitpoints: u32,
    /// State machine position.
    pub mode: UnitMode,
    /// Transient attack modifier, reset at turn start.
    pub attack_modifier: i32,
    /// Transient defense modifier, reset at turn start.
    pub defense_modifier: i32,
    /// Persistent attack earned from kills.
    pub veterancy: i32,
    /// One-shot flags.
    pub flags: ActionFlags,
    /// Losing this unit defeats its owner.
    pub must_survive: bool,
    /// Killed but not yet removed.
    pub dead: bool,
}

impl Unit {
    /// Create a full-health unit in `Ready` mode.
    #[must_use]
    pub fn new(type_key: UnitTypeKey, unit_type: &UnitType, owner: PlayerId, cell: Cell) -> Self {
        Self {
            type_key,
            owner,
            cell,
            hitpoints: unit_type.hitpoints,
            mode: UnitMode::Ready,
            attack_modifier: 0,
            defense_modifier: 0,
            veterancy: 0,
            flags: ActionFlags::default(),
            must_survive: false,
            dead: false,
        }
    }

    /// Whether the unit is still on the board and fighting.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Whether the unit has finished its turn.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.mode == UnitMode::Done
    }

    /// Hitpoints missing from `max`.
    #[must_use]
    pub const fn damage_taken(&self, max: u32) -> u32 {
        max.saturating_sub(self.hitpoints)
    }
}

/// Pooled storage for every unit in a match.
#[derive(Debug, Clone, Default)]
pub struct UnitStore {
    pool: Pool<Unit>,
}

impl UnitStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { pool: Pool::new() }
    }

    /// Add a unit.
    pub fn spawn(&mut self, unit: Unit) -> UnitId {
        self.pool.insert(unit)
    }

    /// Return a unit's slot to the pool.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.pool.remove(id)
    }

    /// Borrow a unit.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.pool.get(id)
    }

    /// Mutably borrow a unit.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.pool.get_mut(id)
    }

    /// Number of stored units.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pool.len()
    }

    /// Check if no units are stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Remove every unit.
    pub fn clear(&mut self) {
        self.pool.clear();
    }

    /// All stored units in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.pool.iter()
    }

    /// All stored units, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (UnitId, &mut Unit)> {
        self.pool.iter_mut()
    }

    /// Live units in slot order.
    pub fn living(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.pool.iter().filter(|(_, u)| u.is_alive())
    }

    /// The live unit standing on `cell`.
    #[must_use]
    pub fn at(&self, cell: Cell) -> Option<(UnitId, &Unit)> {
        self.living().find(|(_, u)| u.cell == cell)
    }

    /// Live units in the eight cells around `cell`.
    pub fn adjacent(&self, cell: Cell) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.living().filter(move |(_, u)| cell.touches(u.cell))
    }

    /// Live units owned by `owner`.
    pub fn owned_by(&self, owner: PlayerId) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.living().filter(move |(_, u)| u.owner == owner)
    }

    /// Ids of live units owned by `owner`.
    #[must_use]
    pub fn ids_owned_by(&self, owner: PlayerId) -> Vec<UnitId> {
        self.owned_by(owner).map(|(id, _)| id).collect()
    }

    /// Number of live units owned by `owner`.
    #[must_use]
    pub fn living_count(&self, owner: PlayerId) -> usize {
        self.owned_by(owner).count()
    }
}
