//! The match orchestrator.
//!
//! [`Game`] owns the board, units, graves and turn rotation. It accepts
//! commands, resolves them synchronously and reports the outcome three ways:
//!
//! - typed notifications through [`EventBus`] and the event log,
//! - [`EffectBatch`]es for the presentation layer, which hold further
//!   commands off until they are completed,
//! - the overlay of the most recent search.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use siege_core::prelude::*;
//!
//! let catalog = Arc::new(Catalog::new(
//!     vec![Terrain::new("a", "Plains", 1)],
//!     vec![UnitType::new("soldier", 5, 2, 10)],
//! ).unwrap());
//! let grid = Grid::new(4, 4, catalog.terrain_key("a").unwrap());
//! let mut game = Game::new(catalog, GameConfig::default(), grid);
//!
//! game.activate_player(PlayerId(1), false).unwrap();
//! let unit = game.spawn("soldier", PlayerId(1), Cell::new(0, 0)).unwrap();
//! game.start_turn(PlayerId(1));
//!
//! game.select(unit);
//! assert!(game.move_unit(unit, Cell::new(1, 0)));
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::effects::{Effect, EffectBatch, EffectQueue, Ticket};
use crate::error::{GameError, Result};
use crate::events::{
    EventBus, GameEvent, ModeChanged, PlayerDefeated, TurnEnded, TurnStarted, UnitKilled,
};
use crate::grave::{Grave, GraveStore};
use crate::grid::{BoardView, Cell, Grid};
use crate::level::{HookResult, LevelOutcome, LevelScript};
use crate::overlay::Overlay;
use crate::pathfinding::{PathSearch, SearchResult};
use crate::persistence::{CurrentRecord, MapRecord, PlayerRecord, SaveState, UnitRecord};
use crate::player::{Player, PlayerId};
use crate::rng::{RandomSource, SeededRandom};
use crate::state_machine::{self, Transition};
use crate::turn::{income_for, TurnController};
use crate::unit::{Unit, UnitId, UnitMode, UnitStore};

/// A running match.
pub struct Game {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) config: GameConfig,
    pub(crate) grid: Grid,
    pub(crate) units: UnitStore,
    pub(crate) graves: GraveStore,
    pub(crate) turns: TurnController,
    pub(crate) search: PathSearch,
    pub(crate) overlay: Overlay,
    pub(crate) selected: Option<UnitId>,
    pub(crate) result: Option<SearchResult>,
    pub(crate) events: EventBus,
    pub(crate) log: Vec<GameEvent>,
    pub(crate) effects: EffectQueue,
    pub(crate) rng: Box<dyn RandomSource>,
    script: Option<Box<dyn LevelScript>>,
    level: Option<String>,
    outcome: LevelOutcome,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("turn", &self.turns.turn())
            .field("current", &self.turns.current())
            .field("units", &self.units.len())
            .field("graves", &self.graves.len())
            .field("level", &self.level)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Create a match on `grid` with no players or units.
    ///
    /// Damage rolls come from a generator seeded with 0; use
    /// [`Game::with_random`] to supply another source.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, config: GameConfig, grid: Grid) -> Self {
        let overlay = Overlay::for_grid(&grid);
        Self {
            catalog,
            config,
            grid,
            units: UnitStore::new(),
            graves: GraveStore::new(),
            turns: TurnController::new(),
            search: PathSearch::new(),
            overlay,
            selected: None,
            result: None,
            events: EventBus::default(),
            log: Vec::new(),
            effects: EffectQueue::new(),
            rng: Box::new(SeededRandom::new(0)),
            script: None,
            level: None,
            outcome: LevelOutcome::InProgress,
        }
    }

    /// Replace the random source.
    #[must_use]
    pub fn with_random(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Create a match from a save record.
    ///
    /// # Errors
    ///
    /// See [`Game::load`].
    pub fn from_save(catalog: Arc<Catalog>, config: GameConfig, save: &SaveState) -> Result<Self> {
        let grid = save.map.to_grid(&catalog, &config.default_terrain)?;
        let mut game = Self::new(catalog, config, grid);
        game.load(save)?;
        Ok(game)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Shared catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Match settings.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Terrain grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Every unit on the board.
    #[must_use]
    pub const fn units(&self) -> &UnitStore {
        &self.units
    }

    /// A unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Mutable access to a unit, for setup and level scripts.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    /// Graves on the board.
    #[must_use]
    pub const fn graves(&self) -> &GraveStore {
        &self.graves
    }

    /// Turn rotation.
    #[must_use]
    pub const fn turns(&self) -> &TurnController {
        &self.turns
    }

    /// A player by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.turns.player(id)
    }

    /// Player whose turn is running.
    #[must_use]
    pub const fn current_player(&self) -> Option<PlayerId> {
        self.turns.current()
    }

    /// Global turn counter.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turns.turn()
    }

    /// Read-only view for board queries.
    #[must_use]
    pub fn board(&self) -> BoardView<'_> {
        BoardView {
            catalog: &self.catalog,
            grid: &self.grid,
            units: &self.units,
        }
    }

    /// Overlay of the most recent search.
    #[must_use]
    pub const fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Selected unit.
    #[must_use]
    pub const fn selected(&self) -> Option<UnitId> {
        self.selected
    }

    /// Result behind the overlay.
    #[must_use]
    pub const fn search_result(&self) -> Option<&SearchResult> {
        self.result.as_ref()
    }

    /// How the level stands.
    #[must_use]
    pub const fn outcome(&self) -> LevelOutcome {
        self.outcome
    }

    /// Id of the running level.
    #[must_use]
    pub fn level_id(&self) -> Option<&str> {
        self.level.as_deref()
    }

    /// Notification channels, for subscribing listeners.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Notifications recorded since the last drain.
    #[must_use]
    pub fn event_log(&self) -> &[GameEvent] {
        &self.log
    }

    /// Take the recorded notifications.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.log)
    }

    // ------------------------------------------------------------------
    // Presentation boundary
    // ------------------------------------------------------------------

    /// Effect batches queued since the last call.
    pub fn take_effects(&mut self) -> Vec<EffectBatch> {
        self.effects.take()
    }

    /// Report a batch as played.
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        self.effects.complete(ticket)
    }

    /// Whether commands are held off by outstanding effects.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.effects.is_blocked()
    }

    /// Take every queued batch and mark it played. For headless callers.
    pub fn settle(&mut self) -> Vec<EffectBatch> {
        let batches = self.effects.take();
        self.effects.complete_all();
        batches
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Seat a roster player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] if the id is not in the roster.
    pub fn activate_player(&mut self, id: PlayerId, ai: bool) -> Result<&mut Player> {
        let profile = self
            .config
            .profile(id)
            .ok_or(GameError::UnknownPlayer(id.0))?;
        Ok(self.turns.activate(profile, ai))
    }

    /// Add gold to a player's treasury. Returns `false` for unknown players.
    pub fn grant_gold(&mut self, id: PlayerId, amount: u32) -> bool {
        match self.turns.player_mut(id) {
            Some(player) => {
                player.gold = player.gold.saturating_add(amount);
                true
            }
            None => false,
        }
    }

    /// Place a unit without cost.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitType`] for an unknown type and
    /// [`GameError::InvalidState`] if the cell is off the board or taken.
    pub fn spawn(&mut self, type_id: &str, owner: PlayerId, cell: Cell) -> Result<UnitId> {
        let key = self
            .catalog
            .unit_type_key(type_id)
            .ok_or_else(|| GameError::UnknownUnitType(type_id.to_string()))?;
        if !self.grid.on_grid(cell) {
            return Err(GameError::InvalidState(format!("cell {cell} is off the board")));
        }
        if self.units.at(cell).is_some() {
            return Err(GameError::InvalidState(format!("cell {cell} is occupied")));
        }
        let unit = Unit::new(key, self.catalog.unit_type(key), owner, cell);
        Ok(self.units.spawn(unit))
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Replace the board, players and units with a save record.
    ///
    /// Graves, selection, queued effects and the outcome are reset. On error
    /// the game is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] for a player outside the roster,
    /// [`GameError::UnknownUnitType`] for an unknown unit type,
    /// [`GameError::InvalidState`] for units off the board or stacked, and
    /// the map errors of [`MapRecord::to_grid`].
    pub fn load(&mut self, save: &SaveState) -> Result<()> {
        let grid = save.map.to_grid(&self.catalog, &self.config.default_terrain)?;
        let mut turns = TurnController::new();
        let mut units = UnitStore::new();

        for record in &save.players {
            let profile = self
                .config
                .profile(record.id)
                .ok_or(GameError::UnknownPlayer(record.id.0))?;
            turns.activate(profile, record.ai).gold = record.gold;

            for u in &record.units {
                let key = self
                    .catalog
                    .unit_type_key(&u.type_id)
                    .ok_or_else(|| GameError::UnknownUnitType(u.type_id.clone()))?;
                let unit_type = self.catalog.unit_type(key);
                let cell = Cell::new(u.x, u.y);
                if !grid.on_grid(cell) {
                    return Err(GameError::InvalidState(format!(
                        "unit {} at {cell} is off the board",
                        u.type_id
                    )));
                }
                if units.at(cell).is_some() {
                    return Err(GameError::InvalidState(format!("two units at {cell}")));
                }

                let mut unit = Unit::new(key, unit_type, record.id, cell);
                unit.veterancy = u.attack;
                unit.defense_modifier = u.defense;
                unit.hitpoints = u
                    .hitpoints
                    .map_or(unit_type.hitpoints, |hp| hp.clamp(1, unit_type.hitpoints));
                unit.must_survive = u.must_survive;
                if let Some(current) = u.current {
                    unit.mode = current.mode;
                    unit.flags = current.flags();
                }
                units.spawn(unit);
            }
        }
        turns.set_turn(save.turn);

        self.overlay = Overlay::for_grid(&grid);
        self.grid = grid;
        self.units = units;
        self.turns = turns;
        self.graves.clear();
        self.selected = None;
        self.result = None;
        self.effects = EffectQueue::new();
        self.outcome = LevelOutcome::InProgress;
        info!(
            turn = save.turn,
            players = save.players.len(),
            units = self.units.len(),
            "match loaded"
        );
        Ok(())
    }

    /// Record the board, active players and their units.
    ///
    /// Graves and the current player are not part of the record.
    #[must_use]
    pub fn save(&self) -> SaveState {
        let turn = self.turns.turn();
        let players = self
            .turns
            .active()
            .iter()
            .filter_map(|&id| self.turns.player(id))
            .map(|player| PlayerRecord {
                id: player.id,
                ai: player.ai,
                gold: player.gold,
                units: self
                    .units
                    .owned_by(player.id)
                    .map(|(_, unit)| self.unit_record(unit, turn))
                    .collect(),
            })
            .collect();

        SaveState {
            turn,
            map: MapRecord::from_grid(&self.catalog, &self.grid),
            players,
        }
    }

    fn unit_record(&self, unit: &Unit, turn: u32) -> UnitRecord {
        let unit_type = self.catalog.unit_type(unit.type_key);
        UnitRecord {
            attack: unit.veterancy,
            defense: unit.defense_modifier,
            hitpoints: (unit.hitpoints < unit_type.hitpoints).then_some(unit.hitpoints),
            must_survive: unit.must_survive,
            current: (turn > 0).then(|| CurrentRecord::capture(unit.mode, unit.flags)),
            ..UnitRecord::new(unit_type.id.clone(), unit.cell.x, unit.cell.y)
        }
    }

    /// Hash of the saved state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.save().state_hash()
    }

    // ------------------------------------------------------------------
    // Levels
    // ------------------------------------------------------------------

    /// Tear down the running level's script.
    pub fn end_level(&mut self) {
        if let Some(mut script) = self.script.take() {
            script.on_end();
        }
        self.level = None;
    }

    pub(crate) fn install_level(&mut self, id: String, script: Option<Box<dyn LevelScript>>) {
        self.level = Some(id);
        self.script = script;
    }

    // ------------------------------------------------------------------
    // Turns
    // ------------------------------------------------------------------

    /// Start `player`'s turn.
    ///
    /// Resets and heals the player's units, credits income and announces
    /// the turn. Ignored while a turn is running or `player` is not active.
    pub fn start_turn(&mut self, player: PlayerId) -> bool {
        if !self.accepting("start turn") {
            return false;
        }
        if let Some(current) = self.turns.current() {
            debug!(%current, %player, "turn already running, start ignored");
            return false;
        }
        let Some(turn) = self.turns.begin(player) else {
            debug!(%player, "inactive player cannot start a turn");
            return false;
        };

        let mut heals = Vec::new();
        for id in self.units.ids_owned_by(player) {
            if let Some(unit) = self.units.get_mut(id) {
                let amount = state_machine::start_turn(&self.catalog, &self.grid, unit);
                if amount > 0 {
                    heals.push(Effect::Heal { unit: id, amount });
                }
            }
        }
        let income = income_for(&self.catalog, &self.grid, player);
        self.turns.credit(player, income);
        info!(%player, turn, income, "turn started");

        if turn > 1 {
            let mut banner = vec![Effect::TurnBanner { player, turn }];
            banner.extend(heals);
            self.effects.push(banner, true);
        } else {
            self.effects.push(heals, false);
        }
        self.emit(GameEvent::TurnStarted(TurnStarted {
            player,
            income,
            turn,
        }));
        true
    }

    /// End the running turn.
    ///
    /// Every unit of the player is forced to `Done` and old graves crumble.
    /// Returns the player whose turn ended.
    pub fn end_turn(&mut self) -> Option<PlayerId> {
        if !self.accepting("end turn") {
            return None;
        }
        self.finish_turn()
    }

    /// End the running turn, if any, and start the next player's.
    pub fn next_player(&mut self) -> Option<PlayerId> {
        if !self.accepting("next player") {
            return None;
        }
        self.finish_turn();
        let next = self.turns.next_player()?;
        self.start_turn(next).then_some(next)
    }

    pub(crate) fn finish_turn(&mut self) -> Option<PlayerId> {
        let player = self.turns.end()?;
        let turn = self.turns.turn();
        for id in self.units.ids_owned_by(player) {
            let transition = self
                .units
                .get_mut(id)
                .and_then(|u| state_machine::set_mode(u, UnitMode::Done));
            self.apply_transition(id, transition);
        }
        self.deselect();
        info!(%player, turn, "turn ended");
        self.emit(GameEvent::TurnEnded(TurnEnded { player, turn }));

        let expired: Vec<Effect> = self
            .graves
            .expire(turn, self.config.grave_max_age)
            .into_iter()
            .map(|g| Effect::GraveExpired { cell: g.cell })
            .collect();
        if !expired.is_empty() {
            debug!(count = expired.len(), "graves expired");
        }
        self.effects.push(expired, false);
        Some(player)
    }

    /// End the turn once every living unit of `owner` is done.
    pub(crate) fn check_turn_complete(&mut self, owner: PlayerId) {
        if !self.config.auto_end_turn || self.turns.current() != Some(owner) {
            return;
        }
        if self.units.owned_by(owner).all(|(_, u)| u.is_done()) {
            debug!(player = %owner, "every unit done");
            self.finish_turn();
        }
    }

    // ------------------------------------------------------------------
    // Internals shared with the command handlers
    // ------------------------------------------------------------------

    pub(crate) fn accepting(&self, command: &str) -> bool {
        if self.effects.is_blocked() {
            debug!(command, blocking = self.effects.blocking(), "ignored while effects play");
            return false;
        }
        if self.outcome.is_over() {
            debug!(command, "ignored after the level ended");
            return false;
        }
        true
    }

    /// Record, broadcast and hand a notification to the level script.
    pub(crate) fn emit(&mut self, event: GameEvent) -> HookResult {
        self.log.push(event);
        self.events.dispatch(&event);
        let Some(script) = self.script.as_mut() else {
            return HookResult::Continue;
        };
        match &event {
            GameEvent::TurnStarted(e) => {
                script.on_turn_start(e);
                HookResult::Continue
            }
            GameEvent::TurnEnded(e) => {
                script.on_turn_end(e);
                HookResult::Continue
            }
            GameEvent::UnitMoved(e) => {
                script.on_unit_moved(e);
                HookResult::Continue
            }
            GameEvent::UnitKilled(e) => script.on_unit_killed(e),
            GameEvent::PlayerDefeated(e) => script.on_player_defeated(e),
            GameEvent::ModeChanged(_) => HookResult::Continue,
        }
    }

    /// Search the range of `mode` for a unit. `None` for modes without one.
    pub(crate) fn search_for(&mut self, id: UnitId, mode: UnitMode) -> Option<SearchResult> {
        let unit = self.units.get(id)?;
        let view = BoardView {
            catalog: &self.catalog,
            grid: &self.grid,
            units: &self.units,
        };
        match mode {
            UnitMode::Move => Some(self.search.movement(&view, unit)),
            UnitMode::Attack => Some(self.search.attack_range(&view, unit)),
            UnitMode::Raise => Some(self.search.raise_range(
                &view,
                &self.graves,
                unit,
                self.config.raise_range,
            )),
            _ => None,
        }
    }

    /// Redraw the overlay for a mode change and announce it.
    pub(crate) fn apply_transition(&mut self, id: UnitId, transition: Option<Transition>) {
        let Some(Transition { from, to }) = transition else {
            return;
        };
        let Some(owner) = self.units.get(id).map(|u| u.owner) else {
            return;
        };
        let result = self.search_for(id, to);
        self.show(result);
        debug!(unit = ?id, from = from.label(), to = to.label(), "mode changed");
        self.emit(GameEvent::ModeChanged(ModeChanged {
            unit: id,
            owner,
            from,
            to,
        }));
    }

    pub(crate) fn show(&mut self, result: Option<SearchResult>) {
        match &result {
            Some(r) => self.overlay.show(r),
            None => self.overlay.clear(),
        }
        self.result = result;
    }

    /// Clear the selection and overlay.
    pub fn deselect(&mut self) {
        self.selected = None;
        self.show(None);
    }

    /// Remove a dead unit, leave its grave and apply the defeat policy.
    pub(crate) fn bury(&mut self, id: UnitId, effects: &mut Vec<Effect>) {
        let Some(unit) = self.units.remove(id) else {
            return;
        };
        let grave = self.catalog.grave_type(unit.type_key).map(|rises_as| Grave {
            cell: unit.cell,
            source: unit.type_key,
            rises_as,
            veterancy: unit.veterancy,
            turn: self.turns.turn(),
        });
        let has_grave = grave.is_some();
        if let Some(grave) = grave {
            if let Some(old) = self.graves.at(unit.cell).map(|(g, _)| g) {
                self.graves.remove(old);
            }
            self.graves.insert(grave);
        }
        effects.push(Effect::Kill {
            unit: id,
            cell: unit.cell,
            grave: has_grave,
        });
        if self.selected == Some(id) {
            self.deselect();
        }

        info!(unit = ?id, owner = %unit.owner, cell = %unit.cell, grave = has_grave, "unit killed");
        let hook = self.emit(GameEvent::UnitKilled(UnitKilled {
            unit: id,
            type_key: unit.type_key,
            owner: unit.owner,
            cell: unit.cell,
            must_survive: unit.must_survive,
        }));
        if hook == HookResult::Suppress {
            return;
        }
        if unit.must_survive || self.units.living_count(unit.owner) == 0 {
            self.defeat(unit.owner);
        }
    }

    /// Take a player out of the match and decide the level outcome.
    pub(crate) fn defeat(&mut self, player: PlayerId) {
        if !self.turns.is_active(player) {
            return;
        }
        if self.turns.current() == Some(player) {
            self.finish_turn();
        }
        self.turns.remove(player);
        info!(%player, remaining = self.turns.active().len(), "player defeated");

        let hook = self.emit(GameEvent::PlayerDefeated(PlayerDefeated { player }));
        if hook == HookResult::Suppress || self.outcome.is_over() {
            return;
        }
        if player == self.config.protagonist {
            info!(%player, "game over");
            self.outcome = LevelOutcome::GameOver { loser: player };
        } else if let [winner] = *self.turns.active() {
            info!(%winner, "level complete");
            self.outcome = LevelOutcome::Complete { winner };
            if let Some(script) = self.script.as_mut() {
                script.on_complete(winner);
            }
        }
    }
}
