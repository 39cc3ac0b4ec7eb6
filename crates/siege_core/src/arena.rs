//! Reusable node store for board searches.
//!
//! One node exists per visited cell. Nodes are handed out by cell index and
//! recycled wholesale by [`SearchArena::reset`], which every search calls
//! before it touches the board. No search can observe a weight or parent
//! left behind by a previous one.

use crate::catalog::TerrainKey;
use crate::grid::{BoardView, Cell};
use crate::player::PlayerId;
use crate::pool::{Key, Pool};
use crate::unit::UnitId;

/// Handle to a node inside a [`SearchArena`].
pub type NodeId = Key<SearchNode>;

/// Snapshot of the unit standing on a cell when its node was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    /// The unit.
    pub unit: UnitId,
    /// Its owner at snapshot time.
    pub owner: PlayerId,
}

/// Per-cell search state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchNode {
    /// Board position.
    pub cell: Cell,
    /// Row-major cell index.
    pub index: usize,
    /// Cumulative movement cost from the origin, `None` until reached.
    pub weight: Option<u32>,
    /// Heuristic distance to the goal, `None` until computed.
    pub distance: Option<u32>,
    /// Open-list priority.
    pub key: u32,
    /// Cheapest known predecessor.
    pub parent: Option<NodeId>,
    /// Terrain at creation time.
    pub terrain: TerrainKey,
    /// Occupant at creation time.
    pub occupant: Option<Occupant>,
}

/// Pooled search nodes indexed by cell.
#[derive(Debug, Default)]
pub struct SearchArena {
    nodes: Pool<SearchNode>,
    by_cell: Vec<Option<NodeId>>,
    in_use: Vec<NodeId>,
}

impl SearchArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return every node to the free list and size the cell index for a
    /// board of `cells` cells.
    pub fn reset(&mut self, cells: usize) {
        for id in self.in_use.drain(..) {
            if let Some(mut node) = self.nodes.remove(id) {
                node.parent = None;
                if let Some(slot) = self.by_cell.get_mut(node.index) {
                    *slot = None;
                }
            }
        }
        if self.by_cell.len() != cells {
            self.by_cell.clear();
            self.by_cell.resize(cells, None);
        }
    }

    /// The node for `cell`, creating it on first visit.
    ///
    /// Returns `None` for off-grid cells.
    pub fn node_for(&mut self, view: &BoardView<'_>, cell: Cell) -> Option<NodeId> {
        let index = view.grid.index_of(cell)?;
        if let Some(existing) = self.by_cell.get(index).copied().flatten() {
            return Some(existing);
        }

        let terrain = view.grid.terrain_at(cell)?;
        let occupant = view.unit_at(cell).map(|(unit, u)| Occupant {
            unit,
            owner: u.owner,
        });
        let id = self.nodes.insert(SearchNode {
            cell,
            index,
            weight: None,
            distance: None,
            key: 0,
            parent: None,
            terrain,
            occupant,
        });
        if let Some(slot) = self.by_cell.get_mut(index) {
            *slot = Some(id);
        }
        self.in_use.push(id);
        Some(id)
    }

    /// Borrow a node.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&SearchNode> {
        self.nodes.get(id)
    }

    /// Mutably borrow a node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SearchNode> {
        self.nodes.get_mut(id)
    }

    /// The node already created for `cell`, if any.
    #[must_use]
    pub fn existing(&self, index: usize) -> Option<NodeId> {
        self.by_cell.get(index).copied().flatten()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of node slots ever allocated.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Cells from the root of `id`'s parent chain to `id` itself.
    #[must_use]
    pub fn path_to(&self, id: NodeId) -> Vec<Cell> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor.and_then(|c| self.nodes.get(c)) {
            path.push(node.cell);
            // A parent chain can never be longer than the set of live nodes.
            if path.len() > self.in_use.len() {
                break;
            }
            cursor = node.parent;
        }
        path.reverse();
        path
    }

    /// Whether every live node is tracked and indexed by its cell.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.nodes.len() == self.in_use.len()
            && self.in_use.iter().all(|&id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| self.existing(n.index) == Some(id))
            })
    }
}
