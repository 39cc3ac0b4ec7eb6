//! Per-cell render hints derived from search results.

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Grid};
use crate::pathfinding::SearchResult;

/// What the presentation layer should draw on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverlayTag {
    /// Nothing.
    #[default]
    Off,
    /// The unit can move here.
    MoveTarget,
    /// In movement range but occupied by an ally.
    MoveBlocked,
    /// An enemy the unit can attack.
    AttackTarget,
    /// In attack range but nothing to hit.
    AttackBlocked,
    /// A grave the unit can raise.
    RaiseTarget,
    /// In raise range but nothing to raise.
    RaiseBlocked,
}

impl OverlayTag {
    /// Single character used by text renderings.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Off => '.',
            Self::MoveTarget => 'm',
            Self::MoveBlocked => 'M',
            Self::AttackTarget => 'a',
            Self::AttackBlocked => 'A',
            Self::RaiseTarget => 'r',
            Self::RaiseBlocked => 'R',
        }
    }

    /// Whether the cell is a legal command target.
    #[must_use]
    pub const fn is_target(self) -> bool {
        matches!(
            self,
            Self::MoveTarget | Self::AttackTarget | Self::RaiseTarget
        )
    }
}

/// Overlay tags for every cell of a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    width: i32,
    height: i32,
    tags: Vec<OverlayTag>,
    visible: bool,
}

impl Overlay {
    /// A blank overlay sized for `grid`.
    #[must_use]
    pub fn for_grid(grid: &Grid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            tags: vec![OverlayTag::Off; grid.len()],
            visible: false,
        }
    }

    fn index_of(&self, cell: Cell) -> Option<usize> {
        (cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height)
            .then(|| (cell.y as usize) * (self.width as usize) + (cell.x as usize))
    }

    /// Reset every cell to [`OverlayTag::Off`] and hide the overlay.
    pub fn clear(&mut self) {
        self.tags.fill(OverlayTag::Off);
        self.visible = false;
    }

    /// Replace the overlay with the tags of a search result.
    pub fn show(&mut self, result: &SearchResult) {
        self.clear();
        for (cell, tag) in result.overlay_tags() {
            if let Some(i) = self.index_of(cell) {
                self.tags[i] = tag;
            }
        }
        self.visible = true;
    }

    /// Tag at a cell, `Off` when off the board.
    #[must_use]
    pub fn tag_at(&self, cell: Cell) -> OverlayTag {
        self.index_of(cell).map_or(OverlayTag::Off, |i| self.tags[i])
    }

    /// Whether a search result is currently shown.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Cells with a non-`Off` tag, row by row.
    pub fn tagged(&self) -> impl Iterator<Item = (Cell, OverlayTag)> + '_ {
        let width = self.width as usize;
        self.tags
            .iter()
            .enumerate()
            .filter(|(_, t)| **t != OverlayTag::Off)
            .map(move |(i, t)| (Cell::new((i % width) as i32, (i / width) as i32), *t))
    }

    /// One line of glyphs per row.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.tags.len() + self.height as usize);
        for row in self.tags.chunks(self.width as usize) {
            out.extend(row.iter().map(|t| t.glyph()));
            out.push('\n');
        }
        out
    }
}
