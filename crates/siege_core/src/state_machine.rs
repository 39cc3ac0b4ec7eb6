//! Per-unit mode transitions.
//!
//! A unit moves through its turn by repeatedly calling [`advance`]. Each
//! call first records the action of the mode being left (so declining a
//! capture still uses up the capture) and then picks the first eligible mode
//! in priority order:
//!
//! 1. `Capture`: terrain capturable by the unit, not yet captured.
//! 2. `Repair`: terrain repairable by the unit, not yet captured.
//! 3. `Raise`: type can raise, has moved, not yet raised.
//! 4. `Attack`: not yet attacked, and moved or may attack before moving.
//! 5. `Move`: not yet moved.
//! 6. `Done`.

use crate::catalog::Catalog;
use crate::grid::Grid;
use crate::unit::{ActionFlags, Unit, UnitMode};

/// A change of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Mode before the change.
    pub from: UnitMode,
    /// Mode after the change.
    pub to: UnitMode,
}

/// The mode `unit` should be in given its flags and position.
#[must_use]
pub fn eligible_mode(catalog: &Catalog, grid: &Grid, unit: &Unit) -> UnitMode {
    if unit.dead {
        return UnitMode::Done;
    }
    let unit_type = catalog.unit_type(unit.type_key);
    let terrain = grid.terrain_at(unit.cell).map(|k| catalog.terrain(k));
    let flags = unit.flags;

    if !flags.captured && terrain.is_some_and(|t| t.is_capturable_by(unit_type, unit.owner)) {
        UnitMode::Capture
    } else if !flags.captured && terrain.is_some_and(|t| t.is_repairable_by(unit_type)) {
        UnitMode::Repair
    } else if !flags.raised && unit_type.raise && flags.moved {
        UnitMode::Raise
    } else if !flags.attacked && (flags.moved || unit_type.attack_before_move) {
        UnitMode::Attack
    } else if !flags.moved {
        UnitMode::Move
    } else {
        UnitMode::Done
    }
}

/// Set the one-shot flag belonging to `mode`.
pub fn mark_used(flags: &mut ActionFlags, mode: UnitMode) {
    match mode {
        UnitMode::Capture | UnitMode::Repair => flags.captured = true,
        UnitMode::Raise => flags.raised = true,
        UnitMode::Attack => flags.attacked = true,
        UnitMode::Move => flags.moved = true,
        UnitMode::Ready | UnitMode::Done => {}
    }
}

/// Leave the current mode and enter the next eligible one.
///
/// `Done` is terminal. Returns the transition when the mode changed.
pub fn advance(catalog: &Catalog, grid: &Grid, unit: &mut Unit) -> Option<Transition> {
    if unit.mode == UnitMode::Done {
        return None;
    }
    if !unit.dead {
        mark_used(&mut unit.flags, unit.mode);
    }
    let next = eligible_mode(catalog, grid, unit);
    set_mode(unit, next)
}

/// Force a mode. Returns the transition when the mode changed.
pub fn set_mode(unit: &mut Unit, mode: UnitMode) -> Option<Transition> {
    if unit.mode == mode {
        return None;
    }
    let from = unit.mode;
    unit.mode = mode;
    Some(Transition { from, to: mode })
}

/// Reset a unit for its owner's new turn.
///
/// Clears flags and transient modifiers, returns to `Ready` and heals on
/// friendly or neutral healing terrain. Returns the hitpoints restored.
pub fn start_turn(catalog: &Catalog, grid: &Grid, unit: &mut Unit) -> u32 {
    unit.flags = ActionFlags::default();
    unit.attack_modifier = 0;
    unit.defense_modifier = 0;
    unit.mode = UnitMode::Ready;

    let max = catalog.unit_type(unit.type_key).hitpoints;
    let missing = unit.damage_taken(max);
    if missing == 0 {
        return 0;
    }
    let Some(terrain) = grid.terrain_at(unit.cell).map(|k| catalog.terrain(k)) else {
        return 0;
    };
    if !terrain.heals(unit.owner) {
        return 0;
    }
    let healed = terrain.heal.min(missing);
    unit.hitpoints += healed;
    healed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Terrain, UnitType};
    use crate::grid::Cell;
    use crate::player::PlayerId;

    fn setup(types: Vec<UnitType>) -> (Catalog, Grid) {
        let village = Terrain {
            capture: 5,
            category: Some("village".into()),
            heal: 2,
            ..Terrain::new("v", "Village", 1)
        };
        let owned = Terrain {
            owner: Some(PlayerId(1)),
            ..village.clone()
        };
        let ruin = Terrain {
            repair: Some("v".into()),
            ..Terrain::new("r", "Ruin", 1)
        };
        let catalog = Catalog::new(
            vec![
                Terrain::new("a", "Plains", 1),
                Terrain {
                    id: "v1".into(),
                    ..owned
                },
                village,
                ruin,
            ],
            types,
        )
        .unwrap();
        let grid = Grid::new(4, 1, catalog.terrain_key("a").unwrap());
        (catalog, grid)
    }

    fn spawn(catalog: &Catalog, id: &str, x: i32) -> Unit {
        let key = catalog.unit_type_key(id).unwrap();
        Unit::new(key, catalog.unit_type(key), PlayerId(1), Cell::new(x, 0))
    }

    #[test]
    fn test_plain_unit_moves_then_attacks() {
        let (catalog, grid) = setup(vec![UnitType::new("soldier", 5, 2, 10)]);
        let mut unit = spawn(&catalog, "soldier", 0);

        assert_eq!(advance(&catalog, &grid, &mut unit).map(|t| t.to), Some(UnitMode::Move));
        assert_eq!(advance(&catalog, &grid, &mut unit).map(|t| t.to), Some(UnitMode::Attack));
        assert!(unit.flags.moved);
        assert_eq!(advance(&catalog, &grid, &mut unit).map(|t| t.to), Some(UnitMode::Done));
        assert!(unit.flags.attacked);
        assert_eq!(advance(&catalog, &grid, &mut unit), None);
    }

    #[test]
    fn test_capture_comes_first_and_is_used_up() {
        let mut soldier = UnitType::new("soldier", 5, 2, 10);
        soldier.capture = 5;
        let (catalog, mut grid) = setup(vec![soldier]);
        grid.set_terrain_at(Cell::new(1, 0), catalog.terrain_key("v").unwrap());
        let mut unit = spawn(&catalog, "soldier", 1);

        assert_eq!(advance(&catalog, &grid, &mut unit).map(|t| t.to), Some(UnitMode::Capture));
        // Declining the capture falls through to movement.
        assert_eq!(advance(&catalog, &grid, &mut unit).map(|t| t.to), Some(UnitMode::Move));
        assert!(unit.flags.captured);
    }

    #[test]
    fn test_own_terrain_is_not_capturable() {
        let mut soldier = UnitType::new("soldier", 5, 2, 10);
        soldier.capture = 5;
        let (catalog, mut grid) = setup(vec![soldier]);
        grid.set_terrain_at(Cell::new(1, 0), catalog.terrain_key("v1").unwrap());
        let unit = spawn(&catalog, "soldier", 1);
        assert_eq!(eligible_mode(&catalog, &grid, &unit), UnitMode::Move);
    }

    #[test]
    fn test_repair_requires_repair_trait() {
        let mut mason = UnitType::new("mason", 1, 1, 10);
        mason.repair = true;
        let (catalog, mut grid) = setup(vec![mason, UnitType::new("soldier", 5, 2, 10)]);
        grid.set_terrain_at(Cell::new(2, 0), catalog.terrain_key("r").unwrap());

        let mason = spawn(&catalog, "mason", 2);
        let soldier = spawn(&catalog, "soldier", 2);
        assert_eq!(eligible_mode(&catalog, &grid, &mason), UnitMode::Repair);
        assert_eq!(eligible_mode(&catalog, &grid, &soldier), UnitMode::Move);
    }

    #[test]
    fn test_raise_only_after_moving() {
        let mut necro = UnitType::new("necromancer", 3, 1, 10);
        necro.raise = true;
        let (catalog, grid) = setup(vec![necro]);
        let mut unit = spawn(&catalog, "necromancer", 0);

        assert_eq!(eligible_mode(&catalog, &grid, &unit), UnitMode::Move);
        unit.flags.moved = true;
        assert_eq!(eligible_mode(&catalog, &grid, &unit), UnitMode::Raise);
        unit.flags.raised = true;
        assert_eq!(eligible_mode(&catalog, &grid, &unit), UnitMode::Attack);
    }

    #[test]
    fn test_attack_before_move() {
        let mut archer = UnitType::new("archer", 4, 1, 10);
        archer.attack_before_move = true;
        let (catalog, grid) = setup(vec![archer]);
        let mut unit = spawn(&catalog, "archer", 0);

        assert_eq!(advance(&catalog, &grid, &mut unit).map(|t| t.to), Some(UnitMode::Attack));
        assert_eq!(advance(&catalog, &grid, &mut unit).map(|t| t.to), Some(UnitMode::Move));
    }

    #[test]
    fn test_dead_unit_is_done() {
        let (catalog, grid) = setup(vec![UnitType::new("soldier", 5, 2, 10)]);
        let mut unit = spawn(&catalog, "soldier", 0);
        unit.dead = true;
        assert_eq!(advance(&catalog, &grid, &mut unit).map(|t| t.to), Some(UnitMode::Done));
        assert!(!unit.flags.moved);
    }

    #[test]
    fn test_start_turn_resets_and_heals() {
        let (catalog, mut grid) = setup(vec![UnitType::new("soldier", 5, 2, 10)]);
        grid.set_terrain_at(Cell::new(0, 0), catalog.terrain_key("v1").unwrap());
        let mut unit = spawn(&catalog, "soldier", 0);
        unit.hitpoints = 9;
        unit.defense_modifier = -2;
        unit.veterancy = 2;
        unit.mode = UnitMode::Done;
        unit.flags.moved = true;

        let healed = start_turn(&catalog, &grid, &mut unit);
        assert_eq!(healed, 1);
        assert_eq!(unit.hitpoints, 10);
        assert_eq!(unit.defense_modifier, 0);
        assert_eq!(unit.veterancy, 2);
        assert_eq!(unit.mode, UnitMode::Ready);
        assert!(unit.flags.is_clear());
    }

    #[test]
    fn test_enemy_terrain_does_not_heal() {
        let (catalog, mut grid) = setup(vec![UnitType::new("soldier", 5, 2, 10)]);
        grid.set_terrain_at(Cell::new(0, 0), catalog.terrain_key("v1").unwrap());
        let key = catalog.unit_type_key("soldier").unwrap();
        let mut unit = Unit::new(key, catalog.unit_type(key), PlayerId(2), Cell::new(0, 0));
        unit.hitpoints = 4;
        assert_eq!(start_turn(&catalog, &grid, &mut unit), 0);
        assert_eq!(unit.hitpoints, 4);
    }
}
