//! Overlay dumps.
//!
//! Loads a saved board, starts the turn of the unit's owner, selects the
//! unit and renders the search it lands in. Glyphs follow
//! [`OverlayTag::glyph`](siege_core::overlay::OverlayTag::glyph).

use std::path::Path;
use std::sync::Arc;

use siege_core::catalog::Catalog;
use siege_core::config::GameConfig;
use siege_core::game::Game;
use siege_core::grid::Cell;
use siege_core::persistence::SaveState;
use siege_core::unit::UnitMode;
use tracing::info;

use crate::error::{read_file, Result, ToolError};
use crate::validate::load_catalog;

/// A rendered overlay and the mode that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayDump {
    /// Mode the selected unit ended up in.
    pub mode: UnitMode,
    /// One line of glyphs per board row.
    pub rows: String,
}

/// Render the overlay for the unit at `at` on a saved board.
///
/// # Errors
///
/// Returns [`ToolError::NoUnit`] if the cell is empty, or the load error if
/// the save does not fit the catalog.
pub fn dump(catalog: Catalog, config: GameConfig, save: &SaveState, at: Cell) -> Result<OverlayDump> {
    let mut game = Game::from_save(Arc::new(catalog), config, save)?;
    let (id, owner) = game
        .units()
        .at(at)
        .map(|(id, unit)| (id, unit.owner))
        .ok_or(ToolError::NoUnit(at))?;

    game.start_turn(owner);
    game.settle();
    game.select(id);

    let mode = game.unit(id).map_or(UnitMode::Done, |u| u.mode);
    info!(cell = %at, %owner, mode = mode.label(), "overlay rendered");
    Ok(OverlayDump {
        mode,
        rows: game.overlay().render(),
    })
}

/// [`dump`] with the catalog and save read from files and default rules.
///
/// # Errors
///
/// Returns an error if either file cannot be read or parsed.
pub fn dump_files(catalog: &Path, save: &Path, at: Cell) -> Result<OverlayDump> {
    let catalog = load_catalog(catalog)?;
    let text = read_file(save)?;
    let save = SaveState::from_json(&text, &save.display().to_string())?;
    dump(catalog, GameConfig::default(), &save, at)
}
