//! Weighted board search in four modes.
//!
//! [`PathSearch`] owns one [`SearchArena`] and one open list and reuses both
//! for every query:
//!
//! - [`PathSearch::route`]: A* toward a goal, stopping once a popped cell is
//!   within a distance band of it.
//! - [`PathSearch::movement`]: uniform-cost flood bounded by the unit's
//!   movement budget.
//! - [`PathSearch::attack_range`]: scan of the cells inside the unit's
//!   attack range.
//! - [`PathSearch::raise_range`]: scan of the square around the unit for
//!   raisable graves.
//!
//! Neighbors are always expanded north, west, east, south, and the open list
//! keeps insertion order among equal keys, so equal inputs produce equal
//! results down to the ordering of targets.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::arena::{NodeId, SearchArena};
use crate::catalog::IMPASSABLE;
use crate::grave::GraveStore;
use crate::grid::{BoardView, Cell};
use crate::math::manhattan_distance;
use crate::overlay::OverlayTag;
use crate::unit::{Unit, UnitId};

/// Which query produced a [`SearchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Cells the unit can move to.
    Movement,
    /// Enemies the unit can attack.
    Attack,
    /// Graves the unit can raise.
    Raise,
}

impl SearchMode {
    /// Overlay tags for (target, blocked) cells.
    #[must_use]
    pub const fn tags(self) -> (OverlayTag, OverlayTag) {
        match self {
            Self::Movement => (OverlayTag::MoveTarget, OverlayTag::MoveBlocked),
            Self::Attack => (OverlayTag::AttackTarget, OverlayTag::AttackBlocked),
            Self::Raise => (OverlayTag::RaiseTarget, OverlayTag::RaiseBlocked),
        }
    }
}

/// A legal destination or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Target cell.
    pub cell: Cell,
    /// Movement cost to reach the cell, or its distance for range scans.
    pub cost: u32,
    /// Predecessor on the cheapest path (movement only).
    pub parent: Option<Cell>,
    /// Unit on the cell (attack only).
    pub unit: Option<UnitId>,
}

/// Outcome of a movement, attack or raise query.
///
/// Results are plain data and stay valid after the arena is reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    mode: SearchMode,
    origin: Cell,
    targets: Vec<Target>,
    blocked: Vec<Cell>,
    lookup: HashMap<Cell, usize>,
}

impl SearchResult {
    fn new(mode: SearchMode, origin: Cell) -> Self {
        Self {
            mode,
            origin,
            targets: Vec::new(),
            blocked: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    fn push_target(&mut self, target: Target) {
        self.lookup.insert(target.cell, self.targets.len());
        self.targets.push(target);
    }

    /// Query that produced this result.
    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Cell the search started from.
    #[must_use]
    pub const fn origin(&self) -> Cell {
        self.origin
    }

    /// Legal targets in discovery order.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Cells in range that are not legal targets, in discovery order.
    #[must_use]
    pub fn blocked(&self) -> &[Cell] {
        &self.blocked
    }

    /// Whether there is nothing to target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Target entry for a cell.
    #[must_use]
    pub fn target_at(&self, cell: Cell) -> Option<&Target> {
        self.lookup.get(&cell).map(|&i| &self.targets[i])
    }

    /// Whether `cell` is a legal target.
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.lookup.contains_key(&cell)
    }

    /// Cells from the origin to a movement target, inclusive.
    #[must_use]
    pub fn path_to(&self, cell: Cell) -> Option<Vec<Cell>> {
        if self.mode != SearchMode::Movement {
            return None;
        }
        let mut path = vec![cell];
        let mut cursor = self.target_at(cell)?;
        while let Some(parent) = cursor.parent {
            path.push(parent);
            if parent == self.origin || path.len() > self.targets.len() + 1 {
                break;
            }
            cursor = self.target_at(parent)?;
        }
        path.reverse();
        Some(path)
    }

    /// Overlay tag for every cell this result covers.
    pub fn overlay_tags(&self) -> impl Iterator<Item = (Cell, OverlayTag)> + '_ {
        let (target, blocked) = self.mode.tags();
        self.targets
            .iter()
            .map(move |t| (t.cell, target))
            .chain(self.blocked.iter().map(move |&c| (c, blocked)))
    }
}

/// Outcome of a point-to-point route query.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Route {
    /// Cells from the origin to the end point, inclusive. A single cell
    /// means the origin already satisfied the distance band.
    Found(Vec<Cell>),
    /// The open list emptied before any cell satisfied the distance band.
    Unreachable,
}

impl Route {
    /// Whether a route was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The route cells, if any.
    #[must_use]
    pub fn cells(&self) -> Option<&[Cell]> {
        match self {
            Self::Found(cells) => Some(cells),
            Self::Unreachable => None,
        }
    }
}

/// Reusable search engine.
#[derive(Debug, Default)]
pub struct PathSearch {
    arena: SearchArena,
    open: VecDeque<NodeId>,
}

impl PathSearch {
    /// Create a search engine with an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the node arena.
    #[must_use]
    pub const fn arena(&self) -> &SearchArena {
        &self.arena
    }

    fn begin(&mut self, view: &BoardView<'_>) {
        self.arena.reset(view.grid.len());
        self.open.clear();
    }

    fn finish(&self) {
        #[cfg(feature = "debug-validation")]
        assert!(
            self.arena.is_consistent(),
            "search arena lost track of a node"
        );
    }

    fn key_of(&self, id: NodeId) -> u32 {
        self.arena.get(id).map_or(u32::MAX, |n| n.key)
    }

    /// Insert into the open list after every entry with a key no greater
    /// than this one, moving the node if it is already open.
    fn push_open(&mut self, id: NodeId) {
        if let Some(pos) = self.open.iter().position(|&o| o == id) {
            self.open.remove(pos);
        }
        let key = self.key_of(id);
        let arena = &self.arena;
        let pos = self
            .open
            .partition_point(|&o| arena.get(o).map_or(u32::MAX, |n| n.key) <= key);
        self.open.insert(pos, id);
    }

    /// Find a route from `unit` to the nearest cell within
    /// `[min_distance, max_distance]` Manhattan distance of `goal`.
    ///
    /// Occupied and impassable cells are obstacles, except the goal itself.
    pub fn route(
        &mut self,
        view: &BoardView<'_>,
        unit: &Unit,
        goal: Cell,
        min_distance: u32,
        max_distance: u32,
    ) -> Route {
        self.begin(view);
        let unit_type = view.unit_type(unit);

        let Some(origin) = self.arena.node_for(view, unit.cell) else {
            debug!(cell = %unit.cell, "route requested from off-grid cell");
            return Route::Unreachable;
        };
        let origin_distance = manhattan_distance(unit.cell, goal);
        if let Some(node) = self.arena.get_mut(origin) {
            node.weight = Some(0);
            node.distance = Some(origin_distance);
            node.key = origin_distance;
        }
        self.open.push_back(origin);

        let mut end = None;
        while let Some(current_id) = self.open.pop_front() {
            let Some(current) = self.arena.get(current_id).copied() else {
                continue;
            };
            let distance = current.distance.unwrap_or(u32::MAX);
            if distance >= min_distance && distance <= max_distance {
                end = Some(current_id);
                break;
            }
            let current_weight = current.weight.unwrap_or(0);

            for cell in current.cell.neighbors() {
                let Some(id) = self.arena.node_for(view, cell) else {
                    continue;
                };
                let Some(node) = self.arena.get_mut(id) else {
                    continue;
                };
                let distance = *node
                    .distance
                    .get_or_insert_with(|| manhattan_distance(cell, goal));
                let step = view
                    .catalog
                    .movement_cost(unit_type, view.catalog.terrain(node.terrain));
                let weight = current_weight.saturating_add(step);
                if node.weight.is_some_and(|w| weight >= w) {
                    continue;
                }

                node.parent = Some(current_id);
                node.weight = Some(weight);
                node.key = weight.saturating_add(distance);
                if cell == goal || (step < IMPASSABLE && node.occupant.is_none()) {
                    self.push_open(id);
                }
            }
        }
        self.finish();

        match end {
            Some(id) => Route::Found(self.arena.path_to(id)),
            None => {
                debug!(from = %unit.cell, to = %goal, "destination is unreachable");
                Route::Unreachable
            }
        }
    }

    /// Cells `unit` can reach with its movement budget.
    ///
    /// Empty cells are targets. Cells holding an ally are recorded as
    /// blocked and are not expanded further; enemy cells are skipped.
    pub fn movement(&mut self, view: &BoardView<'_>, unit: &Unit) -> SearchResult {
        self.begin(view);
        let mut result = SearchResult::new(SearchMode::Movement, unit.cell);
        let unit_type = view.unit_type(unit);
        let budget = unit_type.movement;

        let Some(origin) = self.arena.node_for(view, unit.cell) else {
            debug!(cell = %unit.cell, "movement requested from off-grid cell");
            return result;
        };
        if let Some(node) = self.arena.get_mut(origin) {
            node.weight = Some(0);
        }
        self.open.push_back(origin);

        let mut reached: Vec<NodeId> = Vec::new();
        let mut blocked: Vec<NodeId> = Vec::new();

        while let Some(current_id) = self.open.pop_front() {
            let Some(current) = self.arena.get(current_id).copied() else {
                continue;
            };
            let current_weight = current.weight.unwrap_or(0);

            for cell in current.cell.neighbors() {
                let Some(id) = self.arena.node_for(view, cell) else {
                    continue;
                };
                let Some(node) = self.arena.get_mut(id) else {
                    continue;
                };
                let step = view
                    .catalog
                    .movement_cost(unit_type, view.catalog.terrain(node.terrain));
                let weight = current_weight.saturating_add(step);
                if node.weight.is_some_and(|w| weight >= w) {
                    continue;
                }
                node.weight = Some(weight);

                if step >= IMPASSABLE || weight > budget {
                    continue;
                }
                let first_visit = node.parent.is_none();
                match node.occupant {
                    None => {
                        node.parent = Some(current_id);
                        node.key = weight;
                        if first_visit {
                            reached.push(id);
                        }
                        self.push_open(id);
                    }
                    Some(occupant) if occupant.owner == unit.owner => {
                        node.parent = Some(current_id);
                        if first_visit {
                            blocked.push(id);
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        for id in reached {
            if let Some(node) = self.arena.get(id) {
                result.push_target(Target {
                    cell: node.cell,
                    cost: node.weight.unwrap_or(0),
                    parent: node
                        .parent
                        .and_then(|p| self.arena.get(p))
                        .map(|p| p.cell),
                    unit: None,
                });
            }
        }
        result.blocked = blocked
            .into_iter()
            .filter_map(|id| self.arena.get(id).map(|n| n.cell))
            .collect();
        self.finish();

        debug!(
            origin = %unit.cell,
            budget,
            reachable = result.targets.len(),
            blocked = result.blocked.len(),
            "movement search"
        );
        result
    }

    /// Cells within `unit`'s attack range, split into live enemies and
    /// everything else.
    pub fn attack_range(&mut self, view: &BoardView<'_>, unit: &Unit) -> SearchResult {
        self.begin(view);
        let mut result = SearchResult::new(SearchMode::Attack, unit.cell);
        let unit_type = view.unit_type(unit);
        let reach = unit_type.range_max as i32;

        for cell in square(view, unit.cell, reach) {
            let distance = manhattan_distance(unit.cell, cell);
            if !unit_type.in_range(distance) {
                continue;
            }
            let Some(id) = self.arena.node_for(view, cell) else {
                continue;
            };
            let occupant = self.arena.get(id).and_then(|n| n.occupant);
            match occupant {
                Some(o) if o.owner != unit.owner => result.push_target(Target {
                    cell,
                    cost: distance,
                    parent: None,
                    unit: Some(o.unit),
                }),
                _ => result.blocked.push(cell),
            }
        }
        self.finish();

        debug!(
            origin = %unit.cell,
            targets = result.targets.len(),
            "attack range search"
        );
        result
    }

    /// Cells within `radius` (square) of `unit` holding a grave and no live
    /// unit.
    pub fn raise_range(
        &mut self,
        view: &BoardView<'_>,
        graves: &GraveStore,
        unit: &Unit,
        radius: u32,
    ) -> SearchResult {
        self.begin(view);
        let mut result = SearchResult::new(SearchMode::Raise, unit.cell);

        for cell in square(view, unit.cell, radius as i32) {
            let Some(id) = self.arena.node_for(view, cell) else {
                continue;
            };
            let empty = self.arena.get(id).is_some_and(|n| n.occupant.is_none());
            if empty && graves.at(cell).is_some() {
                result.push_target(Target {
                    cell,
                    cost: manhattan_distance(unit.cell, cell),
                    parent: None,
                    unit: None,
                });
            } else {
                result.blocked.push(cell);
            }
        }
        self.finish();

        debug!(
            origin = %unit.cell,
            graves = result.targets.len(),
            "raise range search"
        );
        result
    }
}

/// On-grid cells of the square of half-width `reach` around `center`, row
/// by row.
fn square(view: &BoardView<'_>, center: Cell, reach: i32) -> impl Iterator<Item = Cell> {
    let grid = view.grid;
    let (min_x, max_x) = (grid.clamp_x(center.x - reach), grid.clamp_x(center.x + reach));
    let (min_y, max_y) = (grid.clamp_y(center.y - reach), grid.clamp_y(center.y + reach));
    (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| Cell::new(x, y)))
}
