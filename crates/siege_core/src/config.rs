//! Match rules.
//!
//! ```ron
//! GameConfig(
//!     random_attacks: true,
//!     raise_range: 1,
//!     grave_max_age: 3,
//!     auto_end_turn: true,
//!     default_terrain: "a",
//!     protagonist: 1,
//! )
//! ```
//!
//! Every field is optional; missing fields take the defaults shown above and
//! the four-player default roster.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::player::{PlayerId, PlayerProfile};

const fn default_true() -> bool {
    true
}

const fn default_raise_range() -> u32 {
    1
}

const fn default_grave_max_age() -> u32 {
    3
}

fn default_terrain() -> String {
    "a".to_string()
}

const fn default_protagonist() -> PlayerId {
    PlayerId(1)
}

/// Rules shared by every level of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Randomize damage bonuses in live combat.
    #[serde(default = "default_true")]
    pub random_attacks: bool,
    /// Half-width of the square searched for graves.
    #[serde(default = "default_raise_range")]
    pub raise_range: u32,
    /// Turns a grave survives before crumbling.
    #[serde(default = "default_grave_max_age")]
    pub grave_max_age: u32,
    /// End a player's turn once all of their units are done.
    #[serde(default = "default_true")]
    pub auto_end_turn: bool,
    /// Terrain used for unknown ids when loading a map.
    #[serde(default = "default_terrain")]
    pub default_terrain: String,
    /// Player whose defeat ends the game.
    #[serde(default = "default_protagonist")]
    pub protagonist: PlayerId,
    /// Players that may take part in a level.
    #[serde(default = "PlayerProfile::default_roster")]
    pub roster: Vec<PlayerProfile>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            random_attacks: true,
            raise_range: default_raise_range(),
            grave_max_age: default_grave_max_age(),
            auto_end_turn: true,
            default_terrain: default_terrain(),
            protagonist: default_protagonist(),
            roster: PlayerProfile::default_roster(),
        }
    }
}

impl GameConfig {
    /// Parse a config from RON text. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not valid RON
    /// and [`GameError::InvalidCatalog`] if the roster repeats a player id.
    pub fn from_ron_str(text: &str, origin: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the roster for duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidCatalog`] on a duplicate player id.
    pub fn validate(&self) -> Result<()> {
        for (i, profile) in self.roster.iter().enumerate() {
            if self.roster[..i].iter().any(|p| p.id == profile.id) {
                return Err(GameError::InvalidCatalog(format!(
                    "duplicate player {} in roster",
                    profile.id
                )));
            }
        }
        Ok(())
    }

    /// Roster entry for a player id.
    #[must_use]
    pub fn profile(&self, id: PlayerId) -> Option<&PlayerProfile> {
        self.roster.iter().find(|p| p.id == id)
    }
}
