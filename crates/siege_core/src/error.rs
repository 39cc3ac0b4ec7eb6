//! Error types for the tactical engine.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all engine errors.
///
/// Gameplay commands that are simply not legal right now (moving outside the
/// computed range, building without gold) are not errors; they are ignored and
/// reported through their `Option`/`bool` return values instead.
#[derive(Debug, Error)]
pub enum GameError {
    /// A terrain id is not present in the catalog.
    #[error("Unknown terrain id: {0}")]
    UnknownTerrain(String),

    /// A unit type id is not present in the catalog.
    #[error("Unknown unit type id: {0}")]
    UnknownUnitType(String),

    /// A player id is not part of the roster.
    #[error("Unknown player id: {0}")]
    UnknownPlayer(u8),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or logical name) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// The catalog failed a consistency check.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// A map record does not describe `width * height` cells.
    #[error("Map is {width}x{height} but has {actual} terrain entries")]
    MapSizeMismatch {
        /// Declared width.
        width: i32,
        /// Declared height.
        height: i32,
        /// Number of entries found.
        actual: usize,
    },

    /// A level with this id was already registered.
    #[error("Level {0} already exists")]
    DuplicateLevel(String),

    /// No level with this id was registered.
    #[error("Level {0} does not exist")]
    UnknownLevel(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
