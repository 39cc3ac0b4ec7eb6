//! Levels, level scripts and the default win/loss policy.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::{GameError, Result};
use crate::events::{PlayerDefeated, TurnEnded, TurnStarted, UnitKilled, UnitMoved};
use crate::game::Game;
use crate::persistence::SaveState;
use crate::player::PlayerId;

/// Whether a script hook lets the default handling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookResult {
    /// Run the default handling.
    #[default]
    Continue,
    /// Skip the default handling.
    Suppress,
}

/// How the level stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelOutcome {
    /// Still being played.
    #[default]
    InProgress,
    /// The protagonist was defeated.
    GameOver {
        /// The defeated protagonist.
        loser: PlayerId,
    },
    /// One player is left standing.
    Complete {
        /// The last active player.
        winner: PlayerId,
    },
}

impl LevelOutcome {
    /// Whether play has stopped.
    #[must_use]
    pub const fn is_over(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Per-level hooks. Every method has a no-op default.
pub trait LevelScript {
    /// Called after the level's record is loaded. Returning
    /// [`HookResult::Suppress`] keeps the first turn from starting.
    fn on_start(&mut self, _game: &mut Game) -> HookResult {
        HookResult::Continue
    }

    /// A turn began.
    fn on_turn_start(&mut self, _event: &TurnStarted) {}

    /// A turn ended.
    fn on_turn_end(&mut self, _event: &TurnEnded) {}

    /// A unit moved.
    fn on_unit_moved(&mut self, _event: &UnitMoved) {}

    /// A unit died. Suppressing skips the defeat checks for its owner.
    fn on_unit_killed(&mut self, _event: &UnitKilled) -> HookResult {
        HookResult::Continue
    }

    /// A player was defeated. Suppressing skips the game-over and
    /// level-complete checks.
    fn on_player_defeated(&mut self, _event: &PlayerDefeated) -> HookResult {
        HookResult::Continue
    }

    /// The level was won.
    fn on_complete(&mut self, _winner: PlayerId) {}

    /// The level is being torn down.
    fn on_end(&mut self) {}
}

type ScriptFactory = Box<dyn Fn() -> Box<dyn LevelScript>>;

/// A playable level.
pub struct Level {
    /// Unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Map and starting units.
    pub record: SaveState,
    /// Level started after this one is completed.
    pub next: Option<String>,
    script: Option<ScriptFactory>,
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("next", &self.next)
            .field("scripted", &self.script.is_some())
            .finish_non_exhaustive()
    }
}

impl Level {
    /// Create an unscripted level.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, record: SaveState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            record,
            next: None,
            script: None,
        }
    }

    /// Chain another level after this one.
    #[must_use]
    pub fn with_next(mut self, id: impl Into<String>) -> Self {
        self.next = Some(id.into());
        self
    }

    /// Attach a script. A fresh script is built every time the level starts.
    #[must_use]
    pub fn with_script(mut self, factory: impl Fn() -> Box<dyn LevelScript> + 'static) -> Self {
        self.script = Some(Box::new(factory));
        self
    }
}

/// All known levels by id.
#[derive(Debug, Default)]
pub struct LevelRegistry {
    levels: BTreeMap<String, Level>,
}

impl LevelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a level.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateLevel`] if the id is taken.
    pub fn register(&mut self, level: Level) -> Result<()> {
        if self.levels.contains_key(&level.id) {
            return Err(GameError::DuplicateLevel(level.id));
        }
        self.levels.insert(level.id.clone(), level);
        Ok(())
    }

    /// A level by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Level> {
        self.levels.get(id)
    }

    /// Registered ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(String::as_str)
    }

    /// Number of registered levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if no levels are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// End the running level and start `id` on `game`.
    ///
    /// Loads the level record, runs the script's start hook and, unless it
    /// suppresses it, starts the first active player's turn.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownLevel`] for an unregistered id, or the
    /// load error if the record does not fit the game's catalog.
    pub fn start(&self, id: &str, game: &mut Game) -> Result<()> {
        let level = self
            .levels
            .get(id)
            .ok_or_else(|| GameError::UnknownLevel(id.to_string()))?;

        game.end_level();
        game.load(&level.record)?;
        info!(level = %level.id, name = %level.name, "starting level");

        let mut script = level.script.as_ref().map(|factory| factory());
        let proceed = script
            .as_mut()
            .map_or(HookResult::Continue, |s| s.on_start(game));
        game.install_level(level.id.clone(), script);

        if proceed == HookResult::Continue && game.current_player().is_none() {
            if let Some(first) = game.turns().active().first().copied() {
                game.start_turn(first);
            }
        }
        Ok(())
    }

    /// Start the follow-up level once the running one is complete.
    ///
    /// Returns the id of the level started, if any.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`LevelRegistry::start`].
    pub fn advance(&self, game: &mut Game) -> Result<Option<String>> {
        if !matches!(game.outcome(), LevelOutcome::Complete { .. }) {
            return Ok(None);
        }
        let next = game
            .level_id()
            .and_then(|id| self.levels.get(id))
            .and_then(|level| level.next.clone());
        match next {
            Some(next) => {
                self.start(&next, game)?;
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }
}
