//! Unit commands and AI queries on [`Game`].
//!
//! Every command re-runs the search for the acting unit and silently
//! ignores targets outside it. Accepted commands queue one blocking effect
//! batch.

use tracing::{debug, info};

use crate::catalog::{TerrainKey, IMPASSABLE};
use crate::combat::{calculate_damage, resolve_attack, resolve_bash, CombatReport, Roll};
use crate::effects::Effect;
use crate::events::{GameEvent, UnitMoved};
use crate::game::Game;
use crate::grid::{BoardView, Cell};
use crate::math::{health_fraction, Fixed};
use crate::pathfinding::{Route, SearchResult};
use crate::player::PlayerId;
use crate::state_machine;
use crate::unit::{Unit, UnitId, UnitMode};

impl Game {
    /// A live unit of the current player in `mode`.
    fn acting_unit(&self, id: UnitId, mode: UnitMode) -> Option<Unit> {
        let Some(unit) = self.units.get(id).filter(|u| u.is_alive()) else {
            debug!(unit = ?id, "no such unit");
            return None;
        };
        if self.turns.current() != Some(unit.owner) {
            debug!(unit = ?id, owner = %unit.owner, "not this player's turn");
            return None;
        }
        if unit.mode != mode {
            debug!(unit = ?id, mode = unit.mode.label(), wanted = mode.label(), "wrong mode");
            return None;
        }
        Some(unit.clone())
    }

    /// Select a unit.
    ///
    /// An own `Ready` unit advances into its first mode; other own units
    /// redraw the range of their current mode. A foreign unit shows its
    /// attack range without changing anything.
    pub fn select(&mut self, id: UnitId) -> bool {
        if !self.accepting("select") {
            return false;
        }
        let Some(unit) = self.units.get(id).filter(|u| u.is_alive()).cloned() else {
            return false;
        };
        self.selected = Some(id);

        if self.turns.current() != Some(unit.owner) {
            let view = BoardView {
                catalog: &self.catalog,
                grid: &self.grid,
                units: &self.units,
            };
            let threat = self.search.attack_range(&view, &unit);
            self.show(Some(threat));
            return true;
        }

        if unit.mode == UnitMode::Ready {
            let transition = self
                .units
                .get_mut(id)
                .and_then(|u| state_machine::advance(&self.catalog, &self.grid, u));
            self.apply_transition(id, transition);
            self.check_turn_complete(unit.owner);
        } else {
            let result = self.search_for(id, unit.mode);
            self.show(result);
        }
        true
    }

    /// Leave the current mode without acting, for example to decline a
    /// capture or skip an attack.
    pub fn advance(&mut self, id: UnitId) -> bool {
        if !self.accepting("advance") {
            return false;
        }
        let Some(unit) = self.units.get_mut(id).filter(|u| u.is_alive()) else {
            return false;
        };
        let owner = unit.owner;
        if self.turns.current() != Some(owner) {
            debug!(unit = ?id, "not this player's turn");
            return false;
        }
        let transition = state_machine::advance(&self.catalog, &self.grid, unit);
        let changed = transition.is_some();
        self.apply_transition(id, transition);
        self.check_turn_complete(owner);
        changed
    }

    /// Move a unit in `Move` mode to a reachable cell.
    ///
    /// Moving clears the capture flag and, for attack-or-move types, uses
    /// up the attack. A basher then strikes the enemy beyond its
    /// destination.
    pub fn move_unit(&mut self, id: UnitId, destination: Cell) -> bool {
        if !self.accepting("move") {
            return false;
        }
        let Some(unit) = self.acting_unit(id, UnitMode::Move) else {
            return false;
        };
        let view = BoardView {
            catalog: &self.catalog,
            grid: &self.grid,
            units: &self.units,
        };
        let reachable = self.search.movement(&view, &unit);
        let Some(path) = reachable.path_to(destination) else {
            debug!(unit = ?id, to = %destination, "destination not reachable");
            return false;
        };

        let transition = {
            let Some(moving) = self.units.get_mut(id) else {
                return false;
            };
            moving.cell = destination;
            moving.flags.captured = false;
            if self.catalog.unit_type(moving.type_key).attack_or_move {
                moving.flags.attacked = true;
            }
            state_machine::advance(&self.catalog, &self.grid, moving)
        };
        debug!(unit = ?id, from = %unit.cell, to = %destination, steps = path.len() - 1, "unit moved");

        let mut effects = vec![Effect::Walk {
            unit: id,
            path: path.clone(),
        }];
        self.apply_transition(id, transition);
        self.emit(GameEvent::UnitMoved(UnitMoved {
            unit: id,
            owner: unit.owner,
            from: unit.cell,
            to: destination,
        }));

        if let [.., before, _] = path[..] {
            self.bash(id, before, &mut effects);
        }
        self.effects.push(effects, true);
        self.check_turn_complete(unit.owner);
        true
    }

    fn bash(&mut self, id: UnitId, from: Cell, effects: &mut Vec<Effect>) {
        let strike = {
            let mut roll = if self.config.random_attacks {
                Roll::Random(&mut *self.rng)
            } else {
                Roll::Max
            };
            resolve_bash(&self.catalog, &mut self.units, id, from, &mut roll)
        };
        let Some(strike) = strike else {
            return;
        };
        effects.push(Effect::Strike(strike));
        if strike.killed {
            self.bury(strike.defender, effects);
        }
    }

    /// Attack the enemy on `target` with a unit in `Attack` mode.
    ///
    /// Returns the exchange, or `None` if the command was ignored.
    pub fn attack(&mut self, id: UnitId, target: Cell) -> Option<CombatReport> {
        if !self.accepting("attack") {
            return None;
        }
        let unit = self.acting_unit(id, UnitMode::Attack)?;
        let view = BoardView {
            catalog: &self.catalog,
            grid: &self.grid,
            units: &self.units,
        };
        let in_range = self.search.attack_range(&view, &unit);
        let Some(defender) = in_range.target_at(target).and_then(|t| t.unit) else {
            debug!(unit = ?id, %target, "no enemy in range there");
            return None;
        };

        let report = {
            let mut roll = if self.config.random_attacks {
                Roll::Random(&mut *self.rng)
            } else {
                Roll::Max
            };
            resolve_attack(&self.catalog, &self.grid, &mut self.units, id, defender, &mut roll)
        };
        info!(
            attacker = ?id,
            defender = ?defender,
            strikes = report.strikes.len(),
            first_strike = report.first_strike,
            "attack resolved"
        );

        let mut effects: Vec<Effect> = report.strikes.iter().copied().map(Effect::Strike).collect();
        for victim in report.killed() {
            self.bury(victim, &mut effects);
        }
        let transition = self
            .units
            .get_mut(id)
            .filter(|u| u.is_alive())
            .and_then(|u| state_machine::advance(&self.catalog, &self.grid, u));
        self.apply_transition(id, transition);
        self.effects.push(effects, true);
        self.check_turn_complete(unit.owner);
        Some(report)
    }

    /// Capture the terrain under a unit in `Capture` mode.
    pub fn capture(&mut self, id: UnitId) -> bool {
        if !self.accepting("capture") {
            return false;
        }
        let Some(unit) = self.acting_unit(id, UnitMode::Capture) else {
            return false;
        };
        let Some(captured) = self
            .grid
            .terrain_at(unit.cell)
            .and_then(|key| self.catalog.captured_variant(key, unit.owner))
        else {
            debug!(unit = ?id, cell = %unit.cell, "no owned variant of this terrain");
            return false;
        };
        info!(player = %unit.owner, cell = %unit.cell, "terrain captured");
        self.replace_terrain(id, &unit, captured);
        true
    }

    /// Repair the terrain under a unit in `Repair` mode.
    pub fn repair(&mut self, id: UnitId) -> bool {
        if !self.accepting("repair") {
            return false;
        }
        let Some(unit) = self.acting_unit(id, UnitMode::Repair) else {
            return false;
        };
        let Some(repaired) = self
            .grid
            .terrain_at(unit.cell)
            .and_then(|key| self.catalog.repaired_variant(key))
        else {
            return false;
        };
        info!(player = %unit.owner, cell = %unit.cell, "terrain repaired");
        self.replace_terrain(id, &unit, repaired);
        true
    }

    fn replace_terrain(&mut self, id: UnitId, unit: &Unit, terrain: TerrainKey) {
        self.grid.set_terrain_at(unit.cell, terrain);
        let transition = self.units.get_mut(id).and_then(|u| {
            u.flags.captured = true;
            state_machine::set_mode(u, UnitMode::Done)
        });
        self.apply_transition(id, transition);
        self.effects.push(
            vec![Effect::Terrain {
                cell: unit.cell,
                terrain,
            }],
            true,
        );
        self.check_turn_complete(unit.owner);
    }

    /// Raise the grave on `cell` with a unit in `Raise` mode.
    ///
    /// The risen unit joins the raiser's side, keeps the fallen unit's
    /// veterancy and cannot act this turn. Returns its id.
    pub fn raise(&mut self, id: UnitId, cell: Cell) -> Option<UnitId> {
        if !self.accepting("raise") {
            return None;
        }
        let unit = self.acting_unit(id, UnitMode::Raise)?;
        let view = BoardView {
            catalog: &self.catalog,
            grid: &self.grid,
            units: &self.units,
        };
        let in_range = self
            .search
            .raise_range(&view, &self.graves, &unit, self.config.raise_range);
        if !in_range.contains(cell) {
            debug!(unit = ?id, %cell, "no grave to raise there");
            return None;
        }
        let (grave_id, grave) = self.graves.at(cell).map(|(g, grave)| (g, *grave))?;

        let mut risen = Unit::new(
            grave.rises_as,
            self.catalog.unit_type(grave.rises_as),
            unit.owner,
            cell,
        );
        risen.veterancy = grave.veterancy;
        risen.mode = UnitMode::Done;
        let risen_id = self.units.spawn(risen);
        self.graves.remove(grave_id);
        info!(player = %unit.owner, %cell, unit = ?risen_id, "grave raised");

        let transition = self.units.get_mut(id).and_then(|u| {
            u.flags.raised = true;
            state_machine::set_mode(u, UnitMode::Done)
        });
        self.apply_transition(id, transition);
        self.effects.push(
            vec![Effect::Raise {
                unit: risen_id,
                cell,
            }],
            true,
        );
        self.check_turn_complete(unit.owner);
        Some(risen_id)
    }

    /// Buy a unit for `player` on `cell`.
    ///
    /// The cell must be on the board, free and passable for the type, and
    /// the type must have a price the player can pay. The new unit waits
    /// for its owner's next turn.
    pub fn build(&mut self, player: PlayerId, type_id: &str, cell: Cell) -> Option<UnitId> {
        if !self.accepting("build") {
            return None;
        }
        if !self.turns.is_active(player) {
            debug!(%player, "inactive player cannot build");
            return None;
        }
        let Some(key) = self.catalog.unit_type_key(type_id) else {
            debug!(type_id, "unknown unit type");
            return None;
        };
        let unit_type = self.catalog.unit_type(key);
        if unit_type.cost == 0 {
            debug!(type_id, "unit type is not for sale");
            return None;
        }
        let Some(terrain) = self.grid.terrain_at(cell).map(|k| self.catalog.terrain(k)) else {
            debug!(%cell, "build cell is off the board");
            return None;
        };
        if self.catalog.movement_cost(unit_type, terrain) >= IMPASSABLE {
            debug!(%cell, type_id, "terrain is impassable for this type");
            return None;
        }
        if self.units.at(cell).is_some() {
            debug!(%cell, "build cell is occupied");
            return None;
        }
        let paid = self
            .turns
            .player_mut(player)
            .is_some_and(|p| p.try_spend(unit_type.cost));
        if !paid {
            debug!(%player, cost = unit_type.cost, "not enough gold");
            return None;
        }

        let mut unit = Unit::new(key, unit_type, player, cell);
        unit.mode = UnitMode::Done;
        let id = self.units.spawn(unit);
        info!(%player, type_id, %cell, cost = unit_type.cost, "unit built");
        Some(id)
    }

    // ------------------------------------------------------------------
    // AI queries
    // ------------------------------------------------------------------

    /// Damage `attacker` would deal `defender` with the maximum roll.
    #[must_use]
    pub fn preview_damage(&self, attacker: UnitId, defender: UnitId) -> Option<u32> {
        let view = self.board();
        let attacker = self.units.get(attacker)?;
        let defender = self.units.get(defender)?;
        Some(calculate_damage(&view, attacker, defender, &mut Roll::Max))
    }

    /// Remaining health of a unit as a fraction of its type's maximum.
    ///
    /// Damage dealt scales with this, so AI callers weigh attacks by it.
    #[must_use]
    pub fn health_fraction(&self, id: UnitId) -> Option<Fixed> {
        let unit = self.units.get(id)?;
        let max = self.catalog.unit_type(unit.type_key).hitpoints;
        Some(health_fraction(unit.hitpoints, max))
    }

    /// Route for a unit to within `[min_distance, max_distance]` of `goal`.
    pub fn route(&mut self, id: UnitId, goal: Cell, min_distance: u32, max_distance: u32) -> Route {
        let Some(unit) = self.units.get(id) else {
            return Route::Unreachable;
        };
        let view = BoardView {
            catalog: &self.catalog,
            grid: &self.grid,
            units: &self.units,
        };
        self.search
            .route(&view, unit, goal, min_distance, max_distance)
    }

    /// Cells a unit could move to, regardless of its mode.
    pub fn movement_for(&mut self, id: UnitId) -> Option<SearchResult> {
        self.search_for(id, UnitMode::Move)
    }

    /// Cells a unit could attack from where it stands, regardless of its mode.
    pub fn attack_range_for(&mut self, id: UnitId) -> Option<SearchResult> {
        self.search_for(id, UnitMode::Attack)
    }

    /// Graves a unit could raise, regardless of its mode.
    pub fn raise_range_for(&mut self, id: UnitId) -> Option<SearchResult> {
        self.search_for(id, UnitMode::Raise)
    }
}
