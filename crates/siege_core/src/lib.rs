//! # Siege Core
//!
//! Deterministic engine for a turn-based tactical game on a square grid.
//!
//! This crate contains **only** game logic:
//! - No rendering
//! - No IO (data is parsed from strings; files are the caller's business)
//! - No system randomness (damage rolls go through [`rng::RandomSource`])
//!
//! This separation enables:
//! - Headless tools and tests
//! - Reproducible matches from a seed
//! - AI layers built on the same queries the player uses
//!
//! ## Crate Structure
//!
//! - [`grid`] - Board, cells and read-only board views
//! - [`arena`] / [`pathfinding`] - Pooled search nodes and the four search modes
//! - [`combat`] - Attack and defense values, damage, strike order, splash
//! - [`state_machine`] - Per-unit mode transitions
//! - [`turn`] - Player rotation and income
//! - [`game`] - The match orchestrator
//! - [`level`] - Levels, scripts and the win/loss policy

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod arena;
pub mod catalog;
pub mod combat;
mod commands;
pub mod config;
pub mod effects;
pub mod error;
pub mod events;
pub mod game;
pub mod grave;
pub mod grid;
pub mod level;
pub mod math;
pub mod overlay;
pub mod pathfinding;
pub mod persistence;
pub mod player;
pub mod pool;
pub mod rng;
pub mod state_machine;
pub mod turn;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogData, Terrain, TerrainKey, UnitType, UnitTypeKey};
    pub use crate::combat::{CombatReport, Roll, Strike, StrikeKind};
    pub use crate::config::GameConfig;
    pub use crate::effects::{Effect, EffectBatch, Ticket};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{
        GameEvent, ModeChanged, PlayerDefeated, TurnEnded, TurnStarted, UnitKilled, UnitMoved,
    };
    pub use crate::game::Game;
    pub use crate::grid::{BoardView, Cell, Grid};
    pub use crate::level::{HookResult, Level, LevelOutcome, LevelRegistry, LevelScript};
    pub use crate::overlay::{Overlay, OverlayTag};
    pub use crate::pathfinding::{PathSearch, Route, SearchMode, SearchResult};
    pub use crate::persistence::SaveState;
    pub use crate::player::{Player, PlayerId, PlayerProfile};
    pub use crate::rng::{MaxRandom, RandomSource, SeededRandom};
    pub use crate::unit::{Unit, UnitId, UnitMode};
}
