//! Graves left behind by fallen units.

use crate::catalog::UnitTypeKey;
use crate::grid::Cell;
use crate::pool::{Key, Pool};

/// Handle to a grave.
pub type GraveId = Key<Grave>;

/// A corpse marker that can be raised for a few turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grave {
    /// Where the unit fell.
    pub cell: Cell,
    /// Type of the fallen unit.
    pub source: UnitTypeKey,
    /// Type the grave rises as.
    pub rises_as: UnitTypeKey,
    /// Veterancy carried over to the raised unit.
    pub veterancy: i32,
    /// Turn of death.
    pub turn: u32,
}

/// Pooled grave storage.
#[derive(Debug, Clone, Default)]
pub struct GraveStore {
    pool: Pool<Grave>,
}

impl GraveStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { pool: Pool::new() }
    }

    /// Add a grave.
    pub fn insert(&mut self, grave: Grave) -> GraveId {
        self.pool.insert(grave)
    }

    /// Remove a grave.
    pub fn remove(&mut self, id: GraveId) -> Option<Grave> {
        self.pool.remove(id)
    }

    /// Borrow a grave.
    #[must_use]
    pub fn get(&self, id: GraveId) -> Option<&Grave> {
        self.pool.get(id)
    }

    /// The grave on `cell`, if any.
    #[must_use]
    pub fn at(&self, cell: Cell) -> Option<(GraveId, &Grave)> {
        self.pool.iter().find(|(_, g)| g.cell == cell)
    }

    /// All graves in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (GraveId, &Grave)> {
        self.pool.iter()
    }

    /// Number of graves.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pool.len()
    }

    /// Check if there are no graves.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Remove every grave.
    pub fn clear(&mut self) {
        self.pool.clear();
    }

    /// Remove graves dug more than `max_age` turns before `turn`.
    ///
    /// Returns the removed graves in slot order.
    pub fn expire(&mut self, turn: u32, max_age: u32) -> Vec<Grave> {
        let stale: Vec<GraveId> = self
            .pool
            .iter()
            .filter(|(_, g)| g.turn.saturating_add(max_age) < turn)
            .map(|(id, _)| id)
            .collect();
        stale.into_iter().filter_map(|id| self.pool.remove(id)).collect()
    }
}
