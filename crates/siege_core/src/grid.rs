//! The terrain grid and the read-only board view used by search and combat.
//!
//! Terrain lookups are `O(1)` by cell index. Occupancy is derived by scanning
//! the unit store, which is cheap at tactical scale (a few hundred units).

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Terrain, TerrainKey, UnitType};
use crate::error::{GameError, Result};
use crate::unit::{Unit, UnitId, UnitStore};

/// Neighbor offsets in expansion order: north, west, east, south.
///
/// The order is fixed so searches break ties identically on every run.
pub const NEIGHBORS: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Largest board, in cells, that a save may describe.
pub const MAX_CELLS: usize = 256 * 256;

/// A board coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Cell {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Cell {
    /// Create a cell.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell `(dx, dy)` away from this one.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The four orthogonal neighbors in [`NEIGHBORS`] order.
    pub fn neighbors(self) -> impl Iterator<Item = Cell> {
        NEIGHBORS.into_iter().map(move |(dx, dy)| self.offset(dx, dy))
    }

    /// Whether `other` is one of the eight cells surrounding this one.
    #[must_use]
    pub fn touches(self, other: Cell) -> bool {
        self != other && self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Rectangular terrain board stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: i32,
    height: i32,
    terrain: Vec<TerrainKey>,
}

impl Grid {
    /// Create a grid filled with one terrain.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32, fill: TerrainKey) -> Self {
        assert!(width > 0, "Grid width must be positive");
        assert!(height > 0, "Grid height must be positive");

        Self {
            width,
            height,
            terrain: vec![fill; (width as usize) * (height as usize)],
        }
    }

    /// Create a grid from row-major terrain keys.
    pub fn from_terrain(width: i32, height: i32, terrain: Vec<TerrainKey>) -> Result<Self> {
        if width <= 0 || height <= 0 || terrain.len() != (width as usize) * (height as usize) {
            return Err(GameError::MapSizeMismatch {
                width,
                height,
                actual: terrain.len(),
            });
        }
        Ok(Self {
            width,
            height,
            terrain,
        })
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terrain.len()
    }

    /// Always false; grids have at least one cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terrain.is_empty()
    }

    /// Check if a cell is within bounds.
    #[must_use]
    pub const fn on_grid(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Row-major index of an on-grid cell.
    #[must_use]
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        self.on_grid(cell)
            .then(|| (cell.y as usize) * (self.width as usize) + (cell.x as usize))
    }

    /// Cell for a row-major index.
    #[must_use]
    pub fn cell_at_index(&self, index: usize) -> Cell {
        let width = self.width as usize;
        Cell::new((index % width) as i32, (index / width) as i32)
    }

    /// Clamp a column into bounds.
    #[must_use]
    pub fn clamp_x(&self, x: i32) -> i32 {
        x.clamp(0, self.width - 1)
    }

    /// Clamp a row into bounds.
    #[must_use]
    pub fn clamp_y(&self, y: i32) -> i32 {
        y.clamp(0, self.height - 1)
    }

    /// Terrain key at a cell, `None` when off the grid.
    #[must_use]
    pub fn terrain_at(&self, cell: Cell) -> Option<TerrainKey> {
        self.index_of(cell).map(|i| self.terrain[i])
    }

    /// Replace the terrain at a cell. Returns `false` when off the grid.
    pub fn set_terrain_at(&mut self, cell: Cell, key: TerrainKey) -> bool {
        match self.index_of(cell) {
            Some(i) => {
                self.terrain[i] = key;
                true
            }
            None => false,
        }
    }

    /// All cells with their terrain, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (Cell, TerrainKey)> + '_ {
        self.terrain
            .iter()
            .enumerate()
            .map(|(i, &key)| (self.cell_at_index(i), key))
    }
}

/// Read-only view over everything a board query needs.
#[derive(Debug, Clone, Copy)]
pub struct BoardView<'a> {
    /// Shared catalogs.
    pub catalog: &'a Catalog,
    /// Terrain grid.
    pub grid: &'a Grid,
    /// Live units.
    pub units: &'a UnitStore,
}

impl<'a> BoardView<'a> {
    /// Terrain entry at a cell.
    #[must_use]
    pub fn terrain_at(&self, cell: Cell) -> Option<&'a Terrain> {
        self.grid.terrain_at(cell).map(|k| self.catalog.terrain(k))
    }

    /// The live unit standing on a cell.
    #[must_use]
    pub fn unit_at(&self, cell: Cell) -> Option<(UnitId, &'a Unit)> {
        self.units.at(cell)
    }

    /// Catalog entry for a unit's type.
    #[must_use]
    pub fn unit_type(&self, unit: &Unit) -> &'a UnitType {
        self.catalog.unit_type(unit.type_key)
    }

    /// Terrain defense bonus at a cell, 0 when off the grid.
    #[must_use]
    pub fn terrain_defense(&self, cell: Cell) -> i32 {
        self.terrain_at(cell).map_or(0, |t| t.defense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Terrain;

    fn keys() -> (Catalog, TerrainKey, TerrainKey) {
        let catalog = Catalog::new(
            vec![Terrain::new("a", "Plains", 1), Terrain::new("w", "Wall", 99)],
            vec![],
        )
        .unwrap();
        let a = catalog.terrain_key("a").unwrap();
        let w = catalog.terrain_key("w").unwrap();
        (catalog, a, w)
    }

    #[test]
    fn test_bounds_and_index() {
        let (_, a, _) = keys();
        let grid = Grid::new(4, 3, a);
        assert!(grid.on_grid(Cell::new(3, 2)));
        assert!(!grid.on_grid(Cell::new(4, 0)));
        assert!(!grid.on_grid(Cell::new(0, -1)));
        assert_eq!(grid.index_of(Cell::new(1, 2)), Some(9));
        assert_eq!(grid.cell_at_index(9), Cell::new(1, 2));
        assert_eq!(grid.index_of(Cell::new(-1, 0)), None);
    }

    #[test]
    fn test_clamp() {
        let (_, a, _) = keys();
        let grid = Grid::new(4, 3, a);
        assert_eq!(grid.clamp_x(-2), 0);
        assert_eq!(grid.clamp_x(9), 3);
        assert_eq!(grid.clamp_y(1), 1);
        assert_eq!(grid.clamp_y(7), 2);
    }

    #[test]
    fn test_set_and_get_terrain() {
        let (_, a, w) = keys();
        let mut grid = Grid::new(4, 3, a);
        assert!(grid.set_terrain_at(Cell::new(2, 1), w));
        assert_eq!(grid.terrain_at(Cell::new(2, 1)), Some(w));
        assert!(!grid.set_terrain_at(Cell::new(9, 9), w));
        assert_eq!(grid.terrain_at(Cell::new(9, 9)), None);
    }

    #[test]
    fn test_from_terrain_checks_size() {
        let (_, a, _) = keys();
        assert!(Grid::from_terrain(2, 2, vec![a; 4]).is_ok());
        assert!(matches!(
            Grid::from_terrain(2, 2, vec![a; 3]),
            Err(GameError::MapSizeMismatch { actual: 3, .. })
        ));
    }

    #[test]
    fn test_neighbor_order_is_north_west_east_south() {
        let around: Vec<Cell> = Cell::new(5, 5).neighbors().collect();
        assert_eq!(
            around,
            vec![
                Cell::new(5, 4),
                Cell::new(4, 5),
                Cell::new(6, 5),
                Cell::new(5, 6)
            ]
        );
    }

    #[test]
    fn test_touches_includes_diagonals() {
        let c = Cell::new(2, 2);
        assert!(c.touches(Cell::new(3, 3)));
        assert!(c.touches(Cell::new(2, 1)));
        assert!(!c.touches(c));
        assert!(!c.touches(Cell::new(4, 2)));
    }
}
